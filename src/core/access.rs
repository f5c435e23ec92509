//! Bearer token checks for the admin and maintenance routes

/// Extracts the token of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }

    result == 0
}

/// Whether the header carries one of the accepted tokens.
/// Unset tokens never match.
pub fn is_authorized(header: Option<&str>, accepted: &[Option<&str>]) -> bool {
    let Some(presented) = header.and_then(bearer_token) else {
        return false;
    };
    accepted
        .iter()
        .flatten()
        .any(|expected| constant_time_eq(presented, expected))
}
