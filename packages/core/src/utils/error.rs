// Типы ошибок уровня конвейера сообщений

use crate::error::CryptoError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollabError {
    /// Сбой источника энтропии при генерации ключей (не повторяется)
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Повреждённый ключ или шифротекст в асимметричных операциях
    #[error("Cryptography error: {0}")]
    Crypto(String),

    /// Симметричный слой не расшифровался ни одним поколением кольца
    #[error("Decryption failure: {0}")]
    DecryptionFailure(String),

    /// MAC или подпись не совпали: сообщение считается подделанным
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Recipient {0} has no public key on file")]
    RecipientKeyMissing(String),

    #[error("Sender {0} has no private key on file")]
    SenderKeyMissing(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl From<CryptoError> for CollabError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::KeyGenerationError(msg) => CollabError::KeyGeneration(msg),
            other => CollabError::Crypto(other.to_string()),
        }
    }
}

impl CollabError {
    /// Признак подделки: такие ошибки логируются как события безопасности
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, CollabError::IntegrityViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, CollabError>;
