//! Внешние коллабораторы ядра: репозитории пользователей, сообщений и ключей.
//!
//! Ядро не владеет хранилищем, оно лишь вызывает эти трейты. [`memory`]
//! содержит in-memory реализацию для тестов и локального запуска.

pub mod memory;
pub mod models;

use crate::storage::models::{EncryptedMessage, StoredKeyRing, StoredMessage, User};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::MemoryStorage;

/// Пользователи и участники совместных пространств
#[async_trait::async_trait]
pub trait ParticipantDirectory: Send + Sync {
    /// Участники коллаборации вместе с их ключами
    async fn get_participants(&self, collaboration_id: Uuid) -> Result<Vec<User>>;

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Коллаборации, в которых участвует пользователь
    async fn collaborations_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
}

/// Хранилище непрозрачных зашифрованных сообщений
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    async fn create(&self, message: StoredMessage) -> Result<StoredMessage>;

    async fn get(&self, message_id: Uuid) -> Result<Option<StoredMessage>>;

    /// Сообщения коллаборации в порядке создания
    async fn list_for_collaboration(&self, collaboration_id: Uuid) -> Result<Vec<StoredMessage>>;

    /// Заменить все три поля разом
    async fn replace_content(
        &self,
        message_id: Uuid,
        content: EncryptedMessage,
        updated_at: DateTime<Utc>,
    ) -> Result<StoredMessage>;

    /// Отметить прочитанным и сдвинуть `updated_at`
    async fn mark_as_read(&self, message_id: Uuid, updated_at: DateTime<Utc>) -> Result<()>;
}

/// Постоянное хранилище кольца симметричных ключей
#[async_trait::async_trait]
pub trait KeyStore: Send + Sync {
    async fn save_ring(&self, ring: &StoredKeyRing) -> Result<()>;

    async fn load_ring(&self) -> Result<Option<StoredKeyRing>>;
}
