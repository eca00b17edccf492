//! Кольцо поколений симметричного ключа
//!
//! Кольцо неизменяемо: ротация строит новое кольцо ([`KeyRing::rotated`]),
//! а [`SharedKeyRing`] атомарно подменяет указатель на него. Читатели берут
//! снимок (`Arc<KeyRing>`) и никогда не видят частично обновлённое кольцо.
//!
//! ## Формат запечатанного текста
//!
//! ```text
//! 0xC1 || generation (u64 BE) || salt(16) || iv(16) || ciphertext || tag(16)
//! ```
//!
//! Поколение в заголовке позволяет взять нужный ключ сразу. Блоки без
//! заголовка (или с поколением, которого нет в кольце) расшифровываются
//! перебором поколений от текущего к старейшему.

use crate::config::{Config, CryptoSecrets};
use crate::crypto::symmetric::{SymmetricCipher, KEY_LENGTH};
use crate::error::CryptoError;
use crate::storage::models::{StoredKeyRing, StoredSymmetricKey};
use crate::utils::b64;
use crate::utils::error::{CollabError, Result};
use crate::utils::time::current_timestamp;
use rand::rngs::OsRng;
use rand_core::RngCore;
use std::fmt;
use std::sync::{Arc, RwLock};
use zeroize::Zeroizing;

/// Маркер формата запечатанного текста
pub const SEALED_FORMAT_VERSION: u8 = 0xC1;

/// version(1) || generation(8)
pub const SEALED_HEADER_LENGTH: usize = 1 + 8;

/// Одно поколение симметричного ключа
#[derive(Clone)]
pub struct SymmetricKey {
    generation: u64,
    material: Zeroizing<Vec<u8>>,
    created_at: i64,
}

impl SymmetricKey {
    pub fn new(generation: u64, material: Vec<u8>) -> Self {
        Self {
            generation,
            material: Zeroizing::new(material),
            created_at: current_timestamp(),
        }
    }

    /// Новый случайный 256-битный ключ
    pub fn generate(generation: u64) -> std::result::Result<Self, CryptoError> {
        let mut material = Zeroizing::new(vec![0u8; KEY_LENGTH]);
        OsRng.try_fill_bytes(&mut material)?;
        Ok(Self {
            generation,
            material,
            created_at: current_timestamp(),
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn material(&self) -> &[u8] {
        &self.material
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("generation", &self.generation)
            .field("material", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Неизменяемое кольцо: `generations[0]` всегда текущий ключ
#[derive(Debug, Clone)]
pub struct KeyRing {
    generations: Vec<SymmetricKey>,
    capacity: usize,
}

impl KeyRing {
    /// Собрать кольцо из ключей, упорядоченных от текущего к старейшему.
    ///
    /// Поколения должны строго убывать; всё, что не помещается в
    /// `capacity`, отбрасывается.
    pub fn new(mut generations: Vec<SymmetricKey>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CollabError::Config(
                "Key ring capacity must be at least 1".to_string(),
            ));
        }
        if generations.is_empty() {
            return Err(CollabError::Config(
                "Key ring needs a current key".to_string(),
            ));
        }
        if generations
            .windows(2)
            .any(|pair| pair[0].generation <= pair[1].generation)
        {
            return Err(CollabError::Config(
                "Key ring generations must be strictly descending".to_string(),
            ));
        }

        generations.truncate(capacity);
        Ok(Self {
            generations,
            capacity,
        })
    }

    /// Кольцо из секретов конфигурации: OldKey2 → поколение 0,
    /// OldKey1 → 1, CurrentKey → 2. Отсутствующие старые ключи пропускаются.
    pub fn from_secrets(secrets: &CryptoSecrets) -> Result<Self> {
        secrets.validate()?;

        let generations = secrets
            .ring_seeds()
            .into_iter()
            .enumerate()
            .filter_map(|(generation, seed)| {
                seed.map(|s| SymmetricKey::new(generation as u64, s.as_bytes().to_vec()))
            })
            .rev()
            .collect();

        Self::new(generations, Config::global().key_ring_capacity)
    }

    pub fn current(&self) -> &SymmetricKey {
        // new() гарантирует непустое кольцо
        &self.generations[0]
    }

    /// Поколения от текущего к старейшему
    pub fn generations(&self) -> impl Iterator<Item = &SymmetricKey> {
        self.generations.iter()
    }

    pub fn get(&self, generation: u64) -> Option<&SymmetricKey> {
        self.generations.iter().find(|k| k.generation == generation)
    }

    pub fn contains(&self, generation: u64) -> bool {
        self.get(generation).is_some()
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn next_generation(&self) -> u64 {
        self.current().generation + 1
    }

    /// Новое кольцо: `key` становится текущим, старейшее поколение выпадает
    pub fn rotated(&self, key: SymmetricKey) -> Result<Self> {
        let mut generations = Vec::with_capacity(self.capacity);
        generations.push(key);
        generations.extend(self.generations.iter().cloned());
        Self::new(generations, self.capacity)
    }

    /// Зашифровать текущим поколением и добавить заголовок
    pub fn seal(&self, cipher: &SymmetricCipher, plaintext: &[u8]) -> std::result::Result<Vec<u8>, CryptoError> {
        let current = self.current();
        let blob = cipher.encrypt(plaintext, current.material())?;

        let mut sealed = Vec::with_capacity(SEALED_HEADER_LENGTH + blob.len());
        sealed.push(SEALED_FORMAT_VERSION);
        sealed.extend_from_slice(&current.generation.to_be_bytes());
        sealed.extend_from_slice(&blob);
        Ok(sealed)
    }

    /// Расшифровать запечатанный текст; возвращает открытый текст и поколение ключа.
    ///
    /// Ошибка [`CollabError::DecryptionFailure`], если ни одно поколение не подошло.
    pub fn open(&self, cipher: &SymmetricCipher, sealed: &[u8]) -> Result<(Zeroizing<Vec<u8>>, u64)> {
        if let Some((generation, blob)) = split_header(sealed) {
            if let Some(key) = self.get(generation) {
                if let Ok(plaintext) = cipher.decrypt(blob, key.material()) {
                    return Ok((plaintext, generation));
                }
            }

            // Номер поколения мог смениться (кольцо пересобрано из других секретов)
            for key in self.generations.iter().filter(|k| k.generation != generation) {
                if let Ok(plaintext) = cipher.decrypt(blob, key.material()) {
                    return Ok((plaintext, key.generation));
                }
            }
        }

        // Без заголовка: перебор от текущего к старейшему
        for key in &self.generations {
            if let Ok(plaintext) = cipher.decrypt(sealed, key.material()) {
                return Ok((plaintext, key.generation));
            }
        }

        Err(CollabError::DecryptionFailure(format!(
            "No key ring generation ({} retained) could decrypt the content",
            self.generations.len()
        )))
    }

    pub fn to_stored(&self) -> StoredKeyRing {
        StoredKeyRing {
            generations: self
                .generations
                .iter()
                .map(|k| StoredSymmetricKey {
                    generation: k.generation,
                    material: b64::encode(k.material()),
                    created_at: k.created_at,
                })
                .collect(),
        }
    }

    pub fn from_stored(stored: &StoredKeyRing, capacity: usize) -> Result<Self> {
        let generations = stored
            .generations
            .iter()
            .map(|k| -> std::result::Result<SymmetricKey, CryptoError> {
                Ok(SymmetricKey {
                    generation: k.generation,
                    material: Zeroizing::new(b64::decode(&k.material)?),
                    created_at: k.created_at,
                })
            })
            .collect::<std::result::Result<Vec<_>, CryptoError>>()?;
        Self::new(generations, capacity)
    }
}

fn split_header(sealed: &[u8]) -> Option<(u64, &[u8])> {
    if sealed.len() <= SEALED_HEADER_LENGTH || sealed[0] != SEALED_FORMAT_VERSION {
        return None;
    }
    let mut generation = [0u8; 8];
    generation.copy_from_slice(&sealed[1..SEALED_HEADER_LENGTH]);
    Some((u64::from_be_bytes(generation), &sealed[SEALED_HEADER_LENGTH..]))
}

/// Разделяемое кольцо: чтение снимка без блокировки на время криптографии,
/// запись только атомарной подменой указателя
#[derive(Debug)]
pub struct SharedKeyRing {
    inner: RwLock<Arc<KeyRing>>,
}

impl SharedKeyRing {
    pub fn new(ring: KeyRing) -> Self {
        Self {
            inner: RwLock::new(Arc::new(ring)),
        }
    }

    /// Снимок текущего кольца
    pub fn snapshot(&self) -> Arc<KeyRing> {
        // Под замком лежит только Arc, отравление не оставляет его в полусостоянии
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Подменить кольцо, вернуть предыдущее
    pub fn replace(&self, ring: KeyRing) -> Arc<KeyRing> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(ring))
    }
}
