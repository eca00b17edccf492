// Симметричное шифрование текста сообщений
// PBKDF2 для деривации рабочего ключа + AES-256-GCM со 128-битным IV
//
// Формат blob: salt(16) || iv(16) || ciphertext || tag(16)

use crate::config::{Config, MIN_PBKDF2_ITERATIONS};
use crate::error::CryptoError;
use aes_gcm::{
    aead::{consts::U16, Aead, KeyInit},
    aes::Aes256,
    AesGcm, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand_core::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

// Размеры полей blob фиксированы форматом и не настраиваются
pub const SALT_LENGTH: usize = 16;
pub const IV_LENGTH: usize = 16;
pub const KEY_LENGTH: usize = 32;
pub const TAG_LENGTH: usize = 16;

/// Длина заголовка blob: salt || iv
pub const HEADER_LENGTH: usize = SALT_LENGTH + IV_LENGTH;

type Aes256Gcm128 = AesGcm<Aes256, U16>;

/// Шифр с деривацией ключа на каждый вызов.
///
/// Вызывающая сторона передаёт исходный материал ключа (строку из
/// конфигурации или сгенерированные байты кольца); рабочий 256-битный ключ
/// каждый раз выводится через PBKDF2-HMAC-SHA256 со свежей солью.
#[derive(Debug, Clone, Copy)]
pub struct SymmetricCipher {
    iterations: u32,
}

impl SymmetricCipher {
    /// Шифр с числом итераций из глобальной конфигурации
    pub fn new() -> Self {
        Self {
            iterations: Config::global().pbkdf2_iterations.max(MIN_PBKDF2_ITERATIONS),
        }
    }

    pub fn with_iterations(iterations: u32) -> Result<Self, CryptoError> {
        if iterations < MIN_PBKDF2_ITERATIONS {
            return Err(CryptoError::InvalidInputError(format!(
                "PBKDF2 iterations must be at least {}, got {}",
                MIN_PBKDF2_ITERATIONS, iterations
            )));
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Деривировать рабочий ключ из материала и соли
    pub fn derive_key(&self, key_material: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LENGTH]>, CryptoError> {
        if key_material.is_empty() {
            return Err(CryptoError::InvalidKeyError(
                "Key material cannot be empty".to_string(),
            ));
        }
        if salt.len() != SALT_LENGTH {
            return Err(CryptoError::InvalidInputError(format!(
                "Invalid salt length: expected {}, got {}",
                SALT_LENGTH,
                salt.len()
            )));
        }

        let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
        pbkdf2_hmac::<Sha256>(key_material, salt, self.iterations, &mut *key);
        Ok(key)
    }

    /// Зашифровать `plaintext`; каждый вызов использует новые соль и IV
    pub fn encrypt(&self, plaintext: &[u8], key_material: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut salt = [0u8; SALT_LENGTH];
        let mut iv = [0u8; IV_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| CryptoError::KeyGenerationError(e.to_string()))?;
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|e| CryptoError::KeyGenerationError(e.to_string()))?;

        let key = self.derive_key(key_material, &salt)?;
        let cipher = Aes256Gcm128::new_from_slice(key.as_slice())
            .map_err(|e| CryptoError::EncryptionError(e.to_string()))?;

        let ciphertext = cipher
            .encrypt(Nonce::<U16>::from_slice(&iv), plaintext)
            .map_err(|e| CryptoError::EncryptionError(e.to_string()))?;

        // Комбинируем salt + iv + ciphertext
        let mut blob = Vec::with_capacity(HEADER_LENGTH + ciphertext.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Расшифровать blob.
    ///
    /// Неверный ключ, усечённый или изменённый blob дают
    /// [`CryptoError::DecryptionError`]; повреждённые байты наружу не выходят.
    pub fn decrypt(&self, blob: &[u8], key_material: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if blob.len() < HEADER_LENGTH + TAG_LENGTH {
            return Err(CryptoError::DecryptionError(
                "Invalid ciphertext: too short".to_string(),
            ));
        }

        let (salt, rest) = blob.split_at(SALT_LENGTH);
        let (iv, ciphertext) = rest.split_at(IV_LENGTH);

        let key = self.derive_key(key_material, salt)?;
        let cipher = Aes256Gcm128::new_from_slice(key.as_slice())
            .map_err(|e| CryptoError::DecryptionError(e.to_string()))?;

        let plaintext = cipher
            .decrypt(Nonce::<U16>::from_slice(iv), ciphertext)
            .map_err(|_| CryptoError::DecryptionError("Authentication failed".to_string()))?;

        Ok(Zeroizing::new(plaintext))
    }
}

impl Default for SymmetricCipher {
    fn default() -> Self {
        Self::new()
    }
}
