// src/utils/code.rs

use rand::Rng;

const CODE_LENGTH: usize = 8;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random join code: 8 uppercase alphanumeric characters.
/// Uniqueness against existing quizzes is the caller's responsibility
/// (regenerate on collision).
pub fn generate_join_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}
