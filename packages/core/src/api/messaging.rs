// API для отправки и чтения сообщений коллаборации
//
// Здесь проходит граница конвейера: все криптографические ошибки
// превращаются в типизированный результат, нарушения целостности
// логируются как события безопасности.

use crate::crypto::codec::{HybridMessageCodec, Recipient};
use crate::crypto::provider::KeyPairProvider;
use crate::storage::models::{EncryptedMessage, ReadMessage, StoredMessage, User};
use crate::storage::{MessageStore, ParticipantDirectory};
use crate::utils::error::{CollabError, Result};
use crate::utils::time::now;
use crate::utils::validation::validate_message_content;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct MessageService<P: KeyPairProvider> {
    codec: HybridMessageCodec<P>,
    directory: Arc<dyn ParticipantDirectory>,
    messages: Arc<dyn MessageStore>,
}

impl<P: KeyPairProvider> MessageService<P> {
    pub fn new(
        codec: HybridMessageCodec<P>,
        directory: Arc<dyn ParticipantDirectory>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            codec,
            directory,
            messages,
        }
    }

    pub fn codec(&self) -> &HybridMessageCodec<P> {
        &self.codec
    }

    /// Только симметричный слой, без MAC и подписи
    pub fn encrypt_message_content(&self, plaintext: &str) -> Result<String> {
        self.codec.encrypt_content(plaintext)
    }

    pub fn decrypt_message_content(&self, ciphertext: &str) -> Result<String> {
        self.codec.decrypt_content(ciphertext)
    }

    /// Зашифровать и сохранить новое сообщение.
    ///
    /// Получатель чувствительного фрагмента: первый участник коллаборации,
    /// отличный от отправителя.
    pub async fn create_message(
        &self,
        content: &str,
        collaboration_id: Uuid,
        sender_id: Uuid,
    ) -> Result<StoredMessage> {
        validate_message_content(content)?;

        let participants = self.directory.get_participants(collaboration_id).await?;
        let encrypted = self.encrypt_for(content, &participants, sender_id)?;

        let timestamp = now();
        let message = StoredMessage {
            id: Uuid::new_v4(),
            collaboration_id,
            sender_id,
            content: encrypted,
            read: false,
            created_at: timestamp,
            updated_at: timestamp,
        };

        let message = self.messages.create(message).await?;
        info!(
            target: "api::messaging",
            message_id = %message.id,
            collaboration_id = %collaboration_id,
            sender_id = %sender_id,
            "Message created"
        );
        Ok(message)
    }

    /// Перешифровать сообщение новым текстом. Редактировать может только автор;
    /// все три поля заменяются одним вызовом хранилища.
    pub async fn update_message(
        &self,
        message_id: Uuid,
        content: &str,
        editor_id: Uuid,
    ) -> Result<StoredMessage> {
        let existing = self
            .messages
            .get(message_id)
            .await?
            .ok_or_else(|| CollabError::NotFound(format!("message {}", message_id)))?;

        if existing.sender_id != editor_id {
            return Err(CollabError::Validation(
                "Only the sender can edit a message".to_string(),
            ));
        }
        validate_message_content(content)?;

        let participants = self
            .directory
            .get_participants(existing.collaboration_id)
            .await?;
        let encrypted = self.encrypt_for(content, &participants, editor_id)?;

        let updated = self
            .messages
            .replace_content(message_id, encrypted, now())
            .await?;
        info!(target: "api::messaging", message_id = %message_id, "Message updated");
        Ok(updated)
    }

    /// Прочитать все сообщения коллаборации от лица `reader_id`.
    ///
    /// Ошибка одного сообщения не прерывает чтение остальных: она
    /// возвращается в [`ReadMessage::content`]. Это касается и сбоя поиска
    /// отправителя, который уже не состоит в коллаборации.
    pub async fn read_messages(
        &self,
        collaboration_id: Uuid,
        reader_id: Uuid,
    ) -> Result<Vec<ReadMessage>> {
        let participants = self.directory.get_participants(collaboration_id).await?;
        let reader = participants
            .iter()
            .find(|p| p.id == reader_id)
            .ok_or_else(|| {
                CollabError::Validation(format!(
                    "User {} is not a participant of collaboration {}",
                    reader_id, collaboration_id
                ))
            })?;
        let reader_key = reader.private_key_bytes()?;
        let reader_key = reader_key.as_deref().map(|k| k.as_slice());

        let stored = self.messages.list_for_collaboration(collaboration_id).await?;
        let mut read = Vec::with_capacity(stored.len());

        for message in stored {
            let sender = match participants.iter().find(|p| p.id == message.sender_id) {
                Some(sender) => Ok(Some(sender.clone())),
                None => self.directory.get_user(message.sender_id).await,
            };

            let content = sender
                .and_then(|sender| self.decrypt_stored(&message, sender.as_ref(), reader_key));
            if let Err(e) = &content {
                self.report_read_failure(&message, e);
            }

            read.push(ReadMessage {
                id: message.id,
                collaboration_id: message.collaboration_id,
                sender_id: message.sender_id,
                read: message.read,
                created_at: message.created_at,
                updated_at: message.updated_at,
                content,
            });
        }

        debug!(
            target: "api::messaging",
            collaboration_id = %collaboration_id,
            count = read.len(),
            "Messages read"
        );
        Ok(read)
    }

    /// Сообщения из всех коллабораций, где участвует пользователь
    pub async fn read_messages_for_user(&self, reader_id: Uuid) -> Result<Vec<ReadMessage>> {
        let mut all = Vec::new();
        for collaboration_id in self.directory.collaborations_for_user(reader_id).await? {
            all.extend(self.read_messages(collaboration_id, reader_id).await?);
        }
        all.sort_by_key(|m| m.created_at);
        Ok(all)
    }

    /// Непрочитанные сообщения пользователя, новые первыми
    pub async fn read_unread_messages_for_user(&self, reader_id: Uuid) -> Result<Vec<ReadMessage>> {
        let mut unread: Vec<ReadMessage> = self
            .read_messages_for_user(reader_id)
            .await?
            .into_iter()
            .filter(|m| !m.read)
            .collect();
        unread.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(unread)
    }

    /// Отметить сообщение прочитанным. `reader_id` должен быть участником
    /// коллаборации, которой принадлежит сообщение.
    pub async fn mark_as_read(&self, message_id: Uuid, reader_id: Uuid) -> Result<()> {
        let message = self
            .messages
            .get(message_id)
            .await?
            .ok_or_else(|| CollabError::NotFound(format!("message {}", message_id)))?;

        let participants = self
            .directory
            .get_participants(message.collaboration_id)
            .await?;
        if !participants.iter().any(|p| p.id == reader_id) {
            return Err(CollabError::Validation(format!(
                "User {} is not a participant of collaboration {}",
                reader_id, message.collaboration_id
            )));
        }

        self.messages.mark_as_read(message_id, now()).await?;
        debug!(
            target: "api::messaging",
            message_id = %message_id,
            reader_id = %reader_id,
            "Message marked as read"
        );
        Ok(())
    }

    fn encrypt_for(
        &self,
        content: &str,
        participants: &[User],
        sender_id: Uuid,
    ) -> Result<EncryptedMessage> {
        let sender = participants
            .iter()
            .find(|p| p.id == sender_id)
            .ok_or_else(|| {
                CollabError::Validation(format!("User {} is not a participant", sender_id))
            })?;
        let sender_key = sender
            .private_key_bytes()?
            .ok_or_else(|| CollabError::SenderKeyMissing(sender_id.to_string()))?;

        let recipient = participants.iter().find(|p| p.id != sender_id);
        let recipient_id = recipient.map(|r| r.id.to_string());
        let recipient_key = match recipient {
            Some(r) => r.public_key_bytes()?,
            None => None,
        };

        let target = recipient_id.as_deref().map(|user_id| Recipient {
            user_id,
            public_key: recipient_key.as_deref(),
        });

        self.codec.encrypt(content, &sender_key, target)
    }

    fn decrypt_stored(
        &self,
        message: &StoredMessage,
        sender: Option<&User>,
        reader_key: Option<&[u8]>,
    ) -> Result<String> {
        let sender_key = match sender.map(User::public_key_bytes) {
            Some(Ok(Some(key))) => key,
            _ => {
                return Err(CollabError::IntegrityViolation(format!(
                    "No usable public key for sender {}",
                    message.sender_id
                )))
            }
        };

        self.codec.decrypt(&message.content, &sender_key, reader_key)
    }

    fn report_read_failure(&self, message: &StoredMessage, error: &CollabError) {
        if error.is_integrity_violation() {
            warn!(
                target: "security",
                message_id = %message.id,
                sender_id = %message.sender_id,
                collaboration_id = %message.collaboration_id,
                error = %error,
                "Message failed integrity verification"
            );
        } else {
            warn!(
                target: "api::messaging",
                message_id = %message.id,
                error = %error,
                "Message could not be decrypted"
            );
        }
    }
}

/// Сериализовать зашифрованное сообщение в JSON
pub fn serialize_encrypted_message(msg: &EncryptedMessage) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| CollabError::Serialization(e.to_string()))
}

/// Десериализовать зашифрованное сообщение из JSON
pub fn deserialize_encrypted_message(json: &str) -> Result<EncryptedMessage> {
    serde_json::from_str(json).map_err(|e| CollabError::Serialization(e.to_string()))
}
