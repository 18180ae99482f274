//! Content hashing for models.
//!
//! Models serialize deterministically (every map is ordered), so the hash of
//! the serialized form identifies a model's semantic content.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 content hash.
pub type ContentHash = [u8; 32];

/// Compute the SHA-256 content hash of any serializable value.
pub fn content_hash<T: Serialize>(value: &T) -> Result<ContentHash, serde_json::Error> {
    let json = serde_json::to_vec(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&json);
    Ok(hasher.finalize().into())
}

/// Format a content hash as a hex string.
pub fn hash_hex(hash: &ContentHash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn key_order_does_not_change_the_hash() {
        let a: serde_json::Value = serde_json::from_str(r#"{"a": 1, "b": [true]}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"b": [true], "a": 1}"#).unwrap();
        assert_eq!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
    }

    #[test]
    fn different_inputs_different_hash() {
        let h1 = content_hash(&json!("hello")).unwrap();
        let h2 = content_hash(&json!("world")).unwrap();
        assert_ne!(h1, h2);
        assert_eq!(hash_hex(&h1).len(), 64);
    }
}
