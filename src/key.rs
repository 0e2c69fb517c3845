//! [`Key`] is a wrapper around a DeepSeek API key.

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Environment variable the API key is read from.
pub const ENV_VAR: &str = "DEEPSEEK_API_KEY";

/// Error for when a key cannot be used in an `Authorization` header.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InvalidKey {
    /// The key is empty or only whitespace.
    #[error("API key is empty")]
    Empty,
    /// The key contains characters that are not visible ASCII.
    #[error("API key contains an invalid character at byte {index}")]
    Character {
        /// Byte offset of the first invalid character.
        index: usize,
    },
}

/// Error loading the key from the environment.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum KeyError {
    /// The environment variable is not set.
    #[error("environment variable `DEEPSEEK_API_KEY` is not set")]
    Missing,
    /// The environment variable is set but unusable.
    #[error("environment variable `DEEPSEEK_API_KEY` is invalid: {0}")]
    Invalid(#[from] InvalidKey),
}

/// Stores an API key. The key is zeroized on drop and never written out by
/// [`Debug`]. Use [`Key::read`] to get a copy that is likewise zeroized.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Key {
    secret: String,
}

impl Key {
    /// Read the key from [`ENV_VAR`].
    pub fn from_env() -> Result<Self, KeyError> {
        let value = std::env::var(ENV_VAR).map_err(|_| KeyError::Missing)?;
        Ok(Self::try_from(value)?)
    }

    /// Read the key. The copy is zeroized on drop.
    pub fn read(&self) -> Zeroizing<String> {
        Zeroizing::new(self.secret.clone())
    }
}

impl TryFrom<String> for Key {
    type Error = InvalidKey;

    /// Create a new key from a string. Surrounding whitespace is removed. The
    /// string is zeroized when it is rejected.
    fn try_from(s: String) -> Result<Self, Self::Error> {
        let s = Zeroizing::new(s);
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(InvalidKey::Empty);
        }
        if let Some(index) = trimmed.bytes().position(|b| !b.is_ascii_graphic())
        {
            return Err(InvalidKey::Character { index });
        }

        Ok(Self {
            secret: trimmed.to_string(),
        })
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key").field("secret", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const API_KEY: &str = "sk-0123456789abcdef0123456789abcdef";

    #[test]
    fn test_key() {
        let key = Key::try_from(format!("  {API_KEY}\n")).unwrap();
        assert_eq!(key.read().as_str(), API_KEY);
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = Key::try_from(API_KEY.to_string()).unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains(API_KEY));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_invalid_key() {
        assert_eq!(
            Key::try_from("   ".to_string()).unwrap_err(),
            InvalidKey::Empty
        );
        assert_eq!(
            Key::try_from("sk-ab cd".to_string()).unwrap_err(),
            InvalidKey::Character { index: 5 }
        );
        assert_eq!(
            Key::try_from("sk-é".to_string()).unwrap_err().to_string(),
            "API key contains an invalid character at byte 3"
        );
    }
}
