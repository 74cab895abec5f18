//! Checksum utilities for SDL fingerprinting

use sha2::{Sha256, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA256 checksum of SDL text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum of an SDL document
    pub fn of_sdl(sdl: &str) -> Self {
        Self::from_bytes(sdl.as_bytes())
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }

    /// Verify that SDL text matches this checksum
    pub fn verify(&self, sdl: &str) -> bool {
        Self::of_sdl(sdl) == *self
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let sdl = "type Token @entity { id: ID! }";
        assert_eq!(Checksum::of_sdl(sdl), Checksum::of_sdl(sdl));
    }

    #[test]
    fn test_checksum_is_whitespace_sensitive() {
        let a = Checksum::of_sdl("type Token @entity { id: ID! }");
        let b = Checksum::of_sdl("type Token @entity {\n  id: ID!\n}");
        assert_ne!(a, b);
    }

    #[test]
    fn test_checksum_verification() {
        let sdl = "enum Side { buy sell }";
        let checksum = Checksum::of_sdl(sdl);
        assert!(checksum.verify(sdl));
        assert!(!checksum.verify("enum Side { buy }"));
        assert_eq!(checksum.short().len(), 12);
    }
}
