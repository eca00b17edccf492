//! Гибридный кодек сообщений
//!
//! ## Отправка
//!
//! ```text
//! Plain ──sanitize──▶ SensitiveExtracted ──RSA-OAEP(получатель)──▶ SensitiveEncrypted
//!       ──AES-GCM(текущее поколение)──▶ FullyEncrypted ──HMAC──▶ MacApplied
//!       ──RSA-PSS(отправитель)──▶ Signed
//! ```
//!
//! ## Чтение
//!
//! ```text
//! Signed ──HMAC──▶ MacVerified ──PSS──▶ (signature ok) ──кольцо──▶ Decrypted
//!        ──RSA-OAEP(читатель), по фрагменту──▶ SensitiveDecrypted ──▶ Plain
//! ```
//!
//! Каждая стрелка является жёсткой границей: ошибка прерывает операцию
//! целиком. Исключение только одно: фрагмент `[encrypted]`, который читатель
//! не может расшифровать, заменяется плейсхолдером, а не роняет сообщение.

use crate::config::{Config, CryptoSecrets};
use crate::crypto::integrity::{MacService, SignatureService};
use crate::crypto::key_ring::{KeyRing, SharedKeyRing};
use crate::crypto::provider::KeyPairProvider;
use crate::crypto::sensitive::{find_sensitive_span, replace_encrypted_spans};
use crate::crypto::symmetric::SymmetricCipher;
use crate::storage::models::EncryptedMessage;
use crate::utils::b64;
use crate::utils::error::{CollabError, Result};
use crate::utils::validation::sanitize_input;
use std::sync::Arc;
use tracing::debug;

/// Стадии конвейера (для логов и диагностики)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Plain,
    SensitiveExtracted,
    SensitiveEncrypted,
    FullyEncrypted,
    MacApplied,
    Signed,
    MacVerified,
    Decrypted,
    SensitiveDecrypted,
}

/// Получатель чувствительного фрагмента
#[derive(Debug, Clone, Copy)]
pub struct Recipient<'a> {
    pub user_id: &'a str,
    pub public_key: Option<&'a [u8]>,
}

pub struct HybridMessageCodec<P: KeyPairProvider> {
    key_ring: Arc<SharedKeyRing>,
    cipher: SymmetricCipher,
    mac: MacService,
    signatures: SignatureService<P>,
    placeholder: String,
}

impl<P: KeyPairProvider> HybridMessageCodec<P> {
    pub fn new(key_ring: Arc<SharedKeyRing>, mac: MacService) -> Self {
        Self {
            key_ring,
            cipher: SymmetricCipher::new(),
            mac,
            signatures: SignatureService::new(),
            placeholder: Config::global().sensitive_placeholder.clone(),
        }
    }

    /// Кодек с кольцом и MAC-ключом из секретов конфигурации
    pub fn from_secrets(secrets: &CryptoSecrets) -> Result<Self> {
        let ring = KeyRing::from_secrets(secrets)?;
        let mac = MacService::from_secrets(secrets)?;
        Ok(Self::new(Arc::new(SharedKeyRing::new(ring)), mac))
    }

    pub fn with_cipher(mut self, cipher: SymmetricCipher) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn key_ring(&self) -> &Arc<SharedKeyRing> {
        &self.key_ring
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Симметрично зашифровать текст текущим поколением кольца (base64)
    pub fn encrypt_content(&self, plaintext: &str) -> Result<String> {
        let ring = self.key_ring.snapshot();
        let sealed = ring.seal(&self.cipher, plaintext.as_bytes())?;
        Ok(b64::encode(&sealed))
    }

    /// Обратная операция к [`encrypt_content`](Self::encrypt_content)
    pub fn decrypt_content(&self, ciphertext: &str) -> Result<String> {
        let sealed = b64::decode(ciphertext)
            .map_err(|e| CollabError::DecryptionFailure(e.to_string()))?;

        let ring = self.key_ring.snapshot();
        let (plaintext, generation) = ring.open(&self.cipher, &sealed)?;

        debug!(
            target: "crypto::codec",
            generation = generation,
            current = ring.current().generation(),
            "Content decrypted"
        );

        String::from_utf8(plaintext.to_vec())
            .map_err(|e| CollabError::DecryptionFailure(format!("Invalid UTF-8: {}", e)))
    }

    /// Полный конвейер отправки
    ///
    /// # Ошибки
    /// - [`CollabError::RecipientKeyMissing`]: в тексте есть чувствительный
    ///   фрагмент, а у получателя нет открытого ключа (или получателя нет)
    /// - [`CollabError::Crypto`]: фрагмент длиннее лимита RSA-OAEP,
    ///   повреждённые ключи
    pub fn encrypt(
        &self,
        plaintext: &str,
        sender_private_key: &[u8],
        recipient: Option<Recipient<'_>>,
    ) -> Result<EncryptedMessage> {
        trace_stage(PipelineStage::Plain);
        let sanitized = sanitize_input(plaintext);

        let body = match find_sensitive_span(&sanitized) {
            Some(span) => {
                trace_stage(PipelineStage::SensitiveExtracted);

                let recipient = recipient.ok_or_else(|| {
                    CollabError::RecipientKeyMissing("<no other participant>".to_string())
                })?;
                let public_key = recipient
                    .public_key
                    .ok_or_else(|| CollabError::RecipientKeyMissing(recipient.user_id.to_string()))?;

                let encrypted_span = P::encrypt_with_public_key(span.content.as_bytes(), public_key)?;
                trace_stage(PipelineStage::SensitiveEncrypted);

                span.splice_encrypted(&b64::encode(&encrypted_span))
            }
            None => sanitized,
        };

        let ciphertext = self.encrypt_content(&body)?;
        trace_stage(PipelineStage::FullyEncrypted);

        let mac = self.mac.generate_mac(ciphertext.as_bytes())?;
        trace_stage(PipelineStage::MacApplied);

        let signature = self.signatures.sign(ciphertext.as_bytes(), sender_private_key)?;
        trace_stage(PipelineStage::Signed);

        Ok(EncryptedMessage {
            ciphertext,
            mac,
            signature,
        })
    }

    /// Проверка MAC и подписи без расшифровки
    pub fn verify(&self, message: &EncryptedMessage, sender_public_key: &[u8]) -> Result<()> {
        if !self.mac.verify_mac(message.ciphertext.as_bytes(), &message.mac) {
            return Err(CollabError::IntegrityViolation(
                "MAC does not match ciphertext".to_string(),
            ));
        }
        trace_stage(PipelineStage::MacVerified);

        if !self
            .signatures
            .verify(message.ciphertext.as_bytes(), &message.signature, sender_public_key)
        {
            return Err(CollabError::IntegrityViolation(
                "Signature does not match sender".to_string(),
            ));
        }
        Ok(())
    }

    /// Полный конвейер чтения
    ///
    /// `reader_private_key` расшифровывает `[encrypted]` фрагменты; без него
    /// (или при неудаче) фрагмент заменяется плейсхолдером.
    pub fn decrypt(
        &self,
        message: &EncryptedMessage,
        sender_public_key: &[u8],
        reader_private_key: Option<&[u8]>,
    ) -> Result<String> {
        self.verify(message, sender_public_key)?;

        let body = self.decrypt_content(&message.ciphertext)?;
        trace_stage(PipelineStage::Decrypted);

        let mut failed_spans = 0usize;
        let plaintext = replace_encrypted_spans(&body, &self.placeholder, |span| {
            let recovered = reader_private_key.and_then(|key| self.decrypt_span(span, key));
            if recovered.is_none() {
                failed_spans += 1;
            }
            recovered
        });

        if failed_spans > 0 {
            debug!(
                target: "crypto::codec",
                failed_spans = failed_spans,
                "Sensitive spans replaced with placeholder"
            );
        }
        trace_stage(PipelineStage::SensitiveDecrypted);

        Ok(plaintext)
    }

    fn decrypt_span(&self, span: &str, private_key: &[u8]) -> Option<String> {
        let ciphertext = b64::decode(span).ok()?;
        let plaintext = P::decrypt_with_private_key(&ciphertext, private_key).ok()?;
        String::from_utf8(plaintext).ok()
    }
}

fn trace_stage(stage: PipelineStage) {
    tracing::trace!(target: "crypto::codec", stage = ?stage, "Pipeline stage reached");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key_ring::SymmetricKey;
    use crate::crypto::sensitive::count_encrypted_spans;
    use crate::crypto::suites::rsa_suite::RsaSuiteProvider;
    use crate::crypto::test_support::{alice, bob, carol};

    type Codec = HybridMessageCodec<RsaSuiteProvider>;

    fn codec() -> Codec {
        let secrets = CryptoSecrets::new("test-key", "mac-key").with_old_keys(Some("old-1"), None);
        Codec::from_secrets(&secrets).unwrap()
    }

    fn to_bob() -> Option<Recipient<'static>> {
        Some(Recipient {
            user_id: "bob",
            public_key: Some(bob().public_key.as_slice()),
        })
    }

    #[test]
    fn test_plain_message_round_trip() {
        let codec = codec();
        let message = codec.encrypt("Hej 1", &alice().private_key, None).unwrap();

        assert!(!message.ciphertext.contains("Hej"));
        let plaintext = codec
            .decrypt(&message, &alice().public_key, Some(bob().private_key.as_slice()))
            .unwrap();
        assert_eq!(plaintext, "Hej 1");
    }

    #[test]
    fn test_input_is_sanitized() {
        let codec = codec();
        let message = codec.encrypt("<b>hi</b>", &alice().private_key, None).unwrap();
        let plaintext = codec.decrypt(&message, &alice().public_key, None).unwrap();
        assert_eq!(plaintext, "&lt;b&gt;hi&lt;/b&gt;");
    }

    #[test]
    fn test_sensitive_span_for_recipient_only() {
        let codec = codec();
        let message = codec
            .encrypt("pin [sensitive]1234[/sensitive]!", &alice().private_key, to_bob())
            .unwrap();

        // Внешний слой снят, но фрагмент остаётся зашифрованным для Боба
        let body = codec.decrypt_content(&message.ciphertext).unwrap();
        assert!(!body.contains("1234"));
        assert_eq!(count_encrypted_spans(&body), 1);

        let for_bob = codec
            .decrypt(&message, &alice().public_key, Some(bob().private_key.as_slice()))
            .unwrap();
        assert_eq!(for_bob, "pin 1234!");

        let for_carol = codec
            .decrypt(&message, &alice().public_key, Some(carol().private_key.as_slice()))
            .unwrap();
        assert_eq!(for_carol, format!("pin {}!", codec.placeholder()));

        let for_nobody = codec.decrypt(&message, &alice().public_key, None).unwrap();
        assert_eq!(for_nobody, for_carol);
    }

    #[test]
    fn test_recipient_key_missing() {
        let codec = codec();
        let without_key = Some(Recipient {
            user_id: "bob",
            public_key: None,
        });

        let result = codec.encrypt("[sensitive]x[/sensitive]", &alice().private_key, without_key);
        assert_eq!(result, Err(CollabError::RecipientKeyMissing("bob".to_string())));

        let result = codec.encrypt("[sensitive]x[/sensitive]", &alice().private_key, None);
        assert!(matches!(result, Err(CollabError::RecipientKeyMissing(_))));

        // Без фрагмента получатель не нужен
        assert!(codec.encrypt("no span", &alice().private_key, without_key).is_ok());
    }

    #[test]
    fn test_tampered_ciphertext_is_integrity_violation() {
        let codec = codec();
        let mut message = codec.encrypt("Hej 1", &alice().private_key, None).unwrap();

        let mut raw = b64::decode(&message.ciphertext).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        message.ciphertext = b64::encode(&raw);

        let result = codec.decrypt(&message, &alice().public_key, None);
        assert!(matches!(result, Err(CollabError::IntegrityViolation(_))));
    }

    #[test]
    fn test_tampered_mac_is_integrity_violation() {
        let codec = codec();
        let mut message = codec.encrypt("Hej 1", &alice().private_key, None).unwrap();

        let mut tag = b64::decode(&message.mac).unwrap();
        tag[0] ^= 0x01;
        message.mac = b64::encode(&tag);

        assert!(matches!(
            codec.decrypt(&message, &alice().public_key, None),
            Err(CollabError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn test_wrong_sender_is_integrity_violation() {
        let codec = codec();
        let message = codec.encrypt("Hej 1", &alice().private_key, None).unwrap();

        assert!(matches!(
            codec.decrypt(&message, &carol().public_key, None),
            Err(CollabError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn test_verify_without_decrypting() {
        let codec = codec();
        let message = codec.encrypt("Hej 1", &alice().private_key, None).unwrap();

        // Другой кодек с тем же MAC-ключом, но чужим кольцом
        let other = Codec::from_secrets(&CryptoSecrets::new("unrelated", "mac-key")).unwrap();
        assert!(other.verify(&message, &alice().public_key).is_ok());
        assert!(matches!(
            other.decrypt(&message, &alice().public_key, None),
            Err(CollabError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_decrypt_after_rotation() {
        let codec = codec();
        let message = codec.encrypt("before rotation", &alice().private_key, None).unwrap();

        let ring = codec.key_ring().snapshot();
        let next = SymmetricKey::generate(ring.next_generation()).unwrap();
        codec.key_ring().replace(ring.rotated(next).unwrap());

        let plaintext = codec.decrypt(&message, &alice().public_key, None).unwrap();
        assert_eq!(plaintext, "before rotation");
    }

    #[test]
    fn test_span_over_oaep_limit_aborts() {
        let codec = codec();
        let text = format!("[sensitive]{}[/sensitive]", "a".repeat(500));
        let result = codec.encrypt(&text, &alice().private_key, to_bob());
        assert!(matches!(result, Err(CollabError::Crypto(_))));
    }

    #[test]
    fn test_decrypt_content_rejects_garbage() {
        let codec = codec();
        assert!(matches!(
            codec.decrypt_content("!!!"),
            Err(CollabError::DecryptionFailure(_))
        ));
        assert!(matches!(
            codec.decrypt_content(&b64::encode(b"plain legacy text")),
            Err(CollabError::DecryptionFailure(_))
        ));
    }
}
