// Base64 утилиты

use crate::error::CryptoError;
use base64::{engine::general_purpose, Engine};
use sha2::{Digest, Sha256};

pub fn encode(data: &[u8]) -> String {
    general_purpose::STANDARD.encode(data)
}

pub fn decode(data: &str) -> Result<Vec<u8>, CryptoError> {
    general_purpose::STANDARD
        .decode(data)
        .map_err(|e| CryptoError::EncodingError(format!("Base64 decode failed: {}", e)))
}

/// SHA-256 от строки в base64 (для индексов и сравнения без раскрытия данных)
pub fn hash_sensitive_data(data: &str) -> String {
    encode(&Sha256::digest(data.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not base64!!").is_err());
    }

    #[test]
    fn test_hash_sensitive_data_is_stable() {
        let h1 = hash_sensitive_data("secret");
        let h2 = hash_sensitive_data("secret");
        assert_eq!(h1, h2);
        assert_ne!(h1, hash_sensitive_data("Secret"));
        // 32 байта SHA-256 → 44 символа base64
        assert_eq!(h1.len(), 44);
    }
}
