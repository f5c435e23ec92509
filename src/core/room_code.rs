//! Room code generation and validation

use rand::Rng;

use crate::constants::{ROOM_CODE_ALPHABET, ROOM_CODE_LENGTH};
use crate::error::{Result, RoomcastError};

/// Generate a random room code from the unambiguous alphabet
pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let alphabet = ROOM_CODE_ALPHABET.as_bytes();
    (0..ROOM_CODE_LENGTH)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Checks length and alphabet; lowercase input is not valid here
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LENGTH && code.chars().all(|c| ROOM_CODE_ALPHABET.contains(c))
}

/// Trim and upper-case a user supplied code, then validate it
pub fn normalize_room_code(raw: &str) -> Result<String> {
    let code = raw.trim().to_ascii_uppercase();
    if is_valid_room_code(&code) {
        Ok(code)
    } else {
        Err(RoomcastError::InvalidRoomCode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_codes_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let code = generate_room_code(&mut rng);
            assert!(is_valid_room_code(&code), "bad code {}", code);
        }
    }

    #[test]
    fn test_rejects_ambiguous_characters() {
        for code in ["ABCD20", "ABCDO2", "ABCD1Z", "ABCDIZ", "ABCDLZ"] {
            assert!(!is_valid_room_code(code), "{} should be rejected", code);
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_room_code(" abcd23 ").unwrap(), "ABCD23");
        assert!(normalize_room_code("ABCD2").is_err());
        assert!(normalize_room_code("ABCD234").is_err());
        assert!(normalize_room_code("").is_err());
    }
}
