//! CSRF token values and the random sources that produce them.

use std::fmt;

use rand::TryRngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;

use super::CsrfError;

/// Number of random bytes behind each token (hex-encoded to twice this length).
pub const TOKEN_BYTES: usize = 32;

/// An opaque per-session CSRF token.
///
/// `Debug` never prints the value so tokens don't leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Byte-for-byte comparison in constant time.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CsrfToken(..)")
    }
}

/// Source of fresh tokens.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> Result<CsrfToken, CsrfError>;
}

/// Draws token bytes straight from the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngTokenGenerator;

impl TokenGenerator for OsRngTokenGenerator {
    fn generate(&self) -> Result<CsrfToken, CsrfError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CsrfError::CryptoUnavailable(e.to_string()))?;
        Ok(CsrfToken::from_bytes(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_hex_of_expected_length() {
        let token = OsRngTokenGenerator.generate().unwrap();
        assert_eq!(token.as_str().len(), TOKEN_BYTES * 2);
        assert!(
            token
                .as_str()
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }

    #[test]
    fn generated_tokens_differ() {
        let a = OsRngTokenGenerator.generate().unwrap();
        let b = OsRngTokenGenerator.generate().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn matches_requires_exact_bytes() {
        let token = CsrfToken::new("a1b2c3");
        assert!(token.matches("a1b2c3"));
        assert!(!token.matches("a1b2c"));
        assert!(!token.matches("a1b2c3 "));
        assert!(!token.matches("A1B2C3"));
        assert!(!token.matches(""));
    }

    #[test]
    fn debug_output_hides_value() {
        let token = CsrfToken::new("secret-value");
        assert!(!format!("{token:?}").contains("secret-value"));
    }

    #[test]
    fn from_bytes_encodes_lowercase_hex() {
        let token = CsrfToken::from_bytes(&[0x00, 0xab, 0x0f, 0xff]);
        assert_eq!(token.as_str(), "00ab0fff");
    }
}
