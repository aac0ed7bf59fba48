use crate::error::RandomError;
use rand::distributions::Uniform;
use rand::rngs::OsRng;
use rand::Rng;

/// Letters that can be included in a random string.
pub const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Digits that can be included in a random string.
pub const NUMBERS: &str = "0123456789";

/// Symbols that can be included in a random string.
pub const SYMBOLS: &str = "_+";

/// Maximum length of a generated string.
pub const MAX_RANDOM_LENGTH: usize = 4096;

/// Random string configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RandomStringOptions {
    /// Length of the random string to generate.
    pub length: usize,
    /// Include ASCII letters.
    pub include_letters: bool,
    /// Include ASCII digits.
    pub include_numbers: bool,
    /// Include [`SYMBOLS`].
    pub include_symbols: bool,
}

impl Default for RandomStringOptions {
    fn default() -> Self {
        Self {
            length: 32,
            include_letters: true,
            include_numbers: true,
            include_symbols: false,
        }
    }
}

impl RandomStringOptions {
    /// Returns options for an alphanumeric string of the given length.
    pub fn alphanumeric(length: usize) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    /// Returns the characters that the string is drawn from.
    pub fn charset(&self) -> Vec<u8> {
        [
            (self.include_letters, LETTERS),
            (self.include_numbers, NUMBERS),
            (self.include_symbols, SYMBOLS),
        ]
        .into_iter()
        .filter(|(included, _)| *included)
        .flat_map(|(_, class)| class.bytes())
        .collect()
    }

    /// Generates a random string using the operating system's CSPRNG.
    pub fn generate(&self) -> Result<String, RandomError> {
        if self.length > MAX_RANDOM_LENGTH {
            return Err(RandomError::TooLong {
                max: MAX_RANDOM_LENGTH,
            });
        }
        let charset = self.charset();
        if charset.is_empty() {
            return Err(RandomError::EmptyCharset);
        }
        Ok(OsRng
            .sample_iter(Uniform::from(0..charset.len()))
            .take(self.length)
            .map(|i| char::from(charset[i]))
            .collect())
    }
}
