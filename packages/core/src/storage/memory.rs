// In-memory storage для тестов и локального запуска

use crate::storage::models::*;
use crate::storage::{KeyStore, MessageStore, ParticipantDirectory};
use crate::utils::error::{CollabError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory хранилище пользователей, коллабораций, сообщений и кольца ключей
#[derive(Default, Clone)]
pub struct MemoryStorage {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    collaborations: Arc<RwLock<HashMap<Uuid, Vec<Uuid>>>>,
    messages: Arc<RwLock<Vec<StoredMessage>>>,
    key_ring: Arc<RwLock<Option<StoredKeyRing>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // === Пользователи ===

    /// Добавить или заменить пользователя
    pub async fn save_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    // === Коллаборации ===

    pub async fn save_collaboration(&self, collaboration_id: Uuid, participants: Vec<Uuid>) {
        self.collaborations
            .write()
            .await
            .insert(collaboration_id, participants);
    }

    // === Сообщения ===

    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn clear_all(&self) {
        self.users.write().await.clear();
        self.collaborations.write().await.clear();
        self.messages.write().await.clear();
        *self.key_ring.write().await = None;
    }
}

#[async_trait::async_trait]
impl ParticipantDirectory for MemoryStorage {
    async fn get_participants(&self, collaboration_id: Uuid) -> Result<Vec<User>> {
        let collaborations = self.collaborations.read().await;
        let participant_ids = collaborations
            .get(&collaboration_id)
            .ok_or_else(|| CollabError::NotFound(format!("collaboration {}", collaboration_id)))?;

        let users = self.users.read().await;
        Ok(participant_ids
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn collaborations_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let collaborations = self.collaborations.read().await;
        let mut ids: Vec<Uuid> = collaborations
            .iter()
            .filter(|(_, participants)| participants.contains(&user_id))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl MessageStore for MemoryStorage {
    async fn create(&self, message: StoredMessage) -> Result<StoredMessage> {
        let mut messages = self.messages.write().await;
        if messages.iter().any(|m| m.id == message.id) {
            return Err(CollabError::Storage(format!(
                "message {} already exists",
                message.id
            )));
        }
        messages.push(message.clone());
        Ok(message)
    }

    async fn get(&self, message_id: Uuid) -> Result<Option<StoredMessage>> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .find(|m| m.id == message_id)
            .cloned())
    }

    async fn list_for_collaboration(&self, collaboration_id: Uuid) -> Result<Vec<StoredMessage>> {
        let mut messages: Vec<StoredMessage> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.collaboration_id == collaboration_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn replace_content(
        &self,
        message_id: Uuid,
        content: EncryptedMessage,
        updated_at: DateTime<Utc>,
    ) -> Result<StoredMessage> {
        let mut messages = self.messages.write().await;
        let message = messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| CollabError::NotFound(format!("message {}", message_id)))?;

        message.content = content;
        message.updated_at = updated_at;
        Ok(message.clone())
    }

    async fn mark_as_read(&self, message_id: Uuid, updated_at: DateTime<Utc>) -> Result<()> {
        let mut messages = self.messages.write().await;
        let message = messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| CollabError::NotFound(format!("message {}", message_id)))?;
        message.read = true;
        message.updated_at = updated_at;
        Ok(())
    }
}

#[async_trait::async_trait]
impl KeyStore for MemoryStorage {
    async fn save_ring(&self, ring: &StoredKeyRing) -> Result<()> {
        *self.key_ring.write().await = Some(ring.clone());
        Ok(())
    }

    async fn load_ring(&self) -> Result<Option<StoredKeyRing>> {
        Ok(self.key_ring.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message(collaboration_id: Uuid, created_at: DateTime<Utc>) -> StoredMessage {
        StoredMessage {
            id: Uuid::new_v4(),
            collaboration_id,
            sender_id: Uuid::new_v4(),
            content: EncryptedMessage {
                ciphertext: "ct".to_string(),
                mac: "mac".to_string(),
                signature: "sig".to_string(),
            },
            read: false,
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_participants() {
        let storage = MemoryStorage::new();
        let alice = User::new(Uuid::new_v4(), "alice@example.com");
        let bob = User::new(Uuid::new_v4(), "bob@example.com");
        let collaboration = Uuid::new_v4();

        storage.save_user(alice.clone()).await;
        storage.save_user(bob.clone()).await;
        storage
            .save_collaboration(collaboration, vec![alice.id, bob.id])
            .await;

        let participants = storage.get_participants(collaboration).await.unwrap();
        assert_eq!(participants.len(), 2);
        assert_eq!(participants[0].id, alice.id);

        assert_eq!(
            storage.collaborations_for_user(bob.id).await.unwrap(),
            vec![collaboration]
        );
        assert!(matches!(
            storage.get_participants(Uuid::new_v4()).await,
            Err(CollabError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_messages_ordered_by_creation() {
        let storage = MemoryStorage::new();
        let collaboration = Uuid::new_v4();
        let now = Utc::now();

        let later = storage
            .create(message(collaboration, now + Duration::seconds(5)))
            .await
            .unwrap();
        let earlier = storage.create(message(collaboration, now)).await.unwrap();
        storage.create(message(Uuid::new_v4(), now)).await.unwrap();

        let listed = storage.list_for_collaboration(collaboration).await.unwrap();
        assert_eq!(
            listed.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![earlier.id, later.id]
        );
        assert_eq!(storage.message_count().await, 3);
    }

    #[tokio::test]
    async fn test_duplicate_message_rejected() {
        let storage = MemoryStorage::new();
        let msg = message(Uuid::new_v4(), Utc::now());
        storage.create(msg.clone()).await.unwrap();
        assert!(matches!(
            storage.create(msg).await,
            Err(CollabError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_replace_content_and_mark_read() {
        let storage = MemoryStorage::new();
        let msg = storage
            .create(message(Uuid::new_v4(), Utc::now()))
            .await
            .unwrap();

        let replacement = EncryptedMessage {
            ciphertext: "ct2".to_string(),
            mac: "mac2".to_string(),
            signature: "sig2".to_string(),
        };
        let updated_at = msg.created_at + Duration::seconds(1);
        let updated = storage
            .replace_content(msg.id, replacement.clone(), updated_at)
            .await
            .unwrap();
        assert_eq!(updated.content, replacement);
        assert_eq!(updated.updated_at, updated_at);

        let read_at = updated_at + Duration::seconds(1);
        storage.mark_as_read(msg.id, read_at).await.unwrap();
        let read = storage.get(msg.id).await.unwrap().unwrap();
        assert!(read.read);
        assert_eq!(read.updated_at, read_at);

        assert!(matches!(
            storage.mark_as_read(Uuid::new_v4(), read_at).await,
            Err(CollabError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_key_ring_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.load_ring().await.unwrap().is_none());

        let ring = StoredKeyRing {
            generations: vec![StoredSymmetricKey {
                generation: 3,
                material: "a2V5".to_string(),
                created_at: 0,
            }],
        };
        storage.save_ring(&ring).await.unwrap();
        assert_eq!(storage.load_ring().await.unwrap(), Some(ring));

        storage.clear_all().await;
        assert!(storage.load_ring().await.unwrap().is_none());
    }
}
