// Модели данных, которыми ядро обменивается с внешним хранилищем

use crate::error::CryptoError;
use crate::utils::b64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use zeroize::Zeroizing;

/// Пользователь в том виде, в каком его отдаёт репозиторий.
///
/// Ключи хранятся base64 (PKCS#1 DER). Закрытый ключ лежит на сервере рядом
/// с открытым, так устроена исходная схема регистрации.
#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
}

impl User {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            public_key: None,
            private_key: None,
        }
    }

    pub fn with_keys(mut self, public_key: String, private_key: String) -> Self {
        self.public_key = Some(public_key);
        self.private_key = Some(private_key);
        self
    }

    pub fn public_key_bytes(&self) -> Result<Option<Vec<u8>>, CryptoError> {
        self.public_key.as_deref().map(b64::decode).transpose()
    }

    pub fn private_key_bytes(&self) -> Result<Option<Zeroizing<Vec<u8>>>, CryptoError> {
        Ok(self
            .private_key
            .as_deref()
            .map(b64::decode)
            .transpose()?
            .map(Zeroizing::new))
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("public_key", &self.public_key.is_some())
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Результат конвейера отправки: три base64-поля, которые сохраняются вместе
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    pub ciphertext: String,
    pub mac: String,
    pub signature: String,
}

/// Сообщение в хранилище. Открытый текст никогда не сохраняется.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub collaboration_id: Uuid,
    pub sender_id: Uuid,
    #[serde(flatten)]
    pub content: EncryptedMessage,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Сообщение после конвейера чтения
#[derive(Debug, Clone, PartialEq)]
pub struct ReadMessage {
    pub id: Uuid,
    pub collaboration_id: Uuid,
    pub sender_id: Uuid,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Открытый текст (с плейсхолдерами) или типизированная причина отказа
    pub content: crate::utils::error::Result<String>,
}

/// Поколение симметричного ключа в хранилище ключей
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSymmetricKey {
    pub generation: u64,
    /// base64 исходного материала ключа
    pub material: String,
    pub created_at: i64,
}

impl fmt::Debug for StoredSymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSymmetricKey")
            .field("generation", &self.generation)
            .field("material", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Кольцо ключей в хранилище, от текущего поколения к старейшему
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoredKeyRing {
    pub generations: Vec<StoredSymmetricKey>,
}
