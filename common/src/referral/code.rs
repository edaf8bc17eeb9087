// Referral code generation

use crate::config::{REFERRAL_CODE_ALPHABET, REFERRAL_CODE_LENGTH};
use rand::Rng;

/// Draw a random referral code.
/// Uniqueness is not guaranteed here, callers retry against the directory.
pub fn generate_referral_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..REFERRAL_CODE_LENGTH)
        .map(|_| {
            let index = rng.gen_range(0..REFERRAL_CODE_ALPHABET.len());
            REFERRAL_CODE_ALPHABET[index] as char
        })
        .collect()
}

/// Codes are typed by users, accept any case and surrounding spaces
pub fn normalize_referral_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Check that a (normalized) code has the expected shape
pub fn is_valid_referral_code(code: &str) -> bool {
    code.len() == REFERRAL_CODE_LENGTH
        && code.bytes().all(|b| REFERRAL_CODE_ALPHABET.contains(&b))
}
