//! License key generation.
//!
//! Keys only need to be unique and hard to guess casually; they are not
//! secrets. Uniqueness is the caller's job (see `services::licenses`).

use rand::Rng;

/// Unambiguous upper-case alphabet (no I, O, 0, 1).
pub const DEFAULT_KEY_CHARACTERS: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const DEFAULT_KEY_LENGTH: usize = 24;
/// Longest key a product type or the environment may configure.
pub const MAX_KEY_LENGTH: usize = 256;

/// Alphabet and length for keys of one product type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFormat {
    alphabet: Vec<char>,
    length: usize,
}

impl KeyFormat {
    /// Duplicate characters are dropped so every character is equally likely.
    pub fn new(alphabet: &str, length: usize) -> Self {
        let mut chars: Vec<char> = Vec::with_capacity(alphabet.len());
        for c in alphabet.chars() {
            if !chars.contains(&c) {
                chars.push(c);
            }
        }
        Self {
            alphabet: chars,
            length,
        }
    }

    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for KeyFormat {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_CHARACTERS, DEFAULT_KEY_LENGTH)
    }
}

/// Source of candidate license keys.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self, format: &KeyFormat) -> String;
}

/// Draws each character independently from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self, format: &KeyFormat) -> String {
        generate_license_key(format.alphabet(), format.length())
    }
}

/// Produce `length` characters drawn uniformly from `alphabet`.
///
/// An empty alphabet yields an empty string regardless of `length`.
pub fn generate_license_key(alphabet: &[char], length: usize) -> String {
    if alphabet.is_empty() {
        return String::new();
    }
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect()
}
