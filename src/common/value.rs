use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest as ShaDigest, Sha512};

pub type Digest = [u8; 64];

/// Opaque proposed value voted on by PREPARE and COMMIT messages,
/// typically a block digest.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct Value(String);

impl Value {
    pub fn new(value: impl Into<String>) -> Self {
        Value(value.into())
    }

    /// Lowercase hex of the SHA-512 digest of `data`.
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(data);
        let result = hasher.finalize();
        let mut digest = [0u8; 64];
        digest.copy_from_slice(&result[..]);
        Value::from(&digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Digest> for Value {
    fn from(digest: &Digest) -> Self {
        let hex = digest.iter().map(|b| format!("{:02x}", b)).collect::<String>();
        Value(hex)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable_hex() {
        let a = Value::digest(b"block-1");
        let b = Value::digest(b"block-1");
        let c = Value::digest(b"block-2");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 128);
        assert!(a.as_str().chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
    }

    #[test]
    fn test_digest_of_empty_input() {
        // SHA-512("") prefix
        let empty = Value::digest(&[]);
        assert!(empty.as_str().starts_with("cf83e1357eefb8bd"));
    }
}
