//! Централизованная конфигурация для Collab Core
//!
//! Все константы и настройки криптографического ядра определены здесь,
//! чтобы избежать хардкода по всему проекту. Секреты (ключи кольца и
//! MAC-ключ) живут отдельно в [`CryptoSecrets`] и никогда не попадают в
//! глобальный синглтон.

use crate::utils::error::{CollabError, Result};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;
use zeroize::Zeroizing;

/// Глобальная конфигурация приложения (синглтон)
static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// Минимально допустимое число итераций PBKDF2
pub const MIN_PBKDF2_ITERATIONS: u32 = 10_000;

/// Основная структура конфигурации
#[derive(Debug, Clone)]
pub struct Config {
    // ============================================
    // КРИПТОГРАФИЧЕСКИЕ ПАРАМЕТРЫ
    // ============================================

    /// PBKDF2: количество итераций для деривации рабочего ключа
    pub pbkdf2_iterations: u32,

    /// Размер модуля RSA (в битах)
    pub rsa_key_bits: usize,

    // ============================================
    // КОЛЬЦО КЛЮЧЕЙ И РОТАЦИЯ
    // ============================================

    /// Сколько поколений симметричного ключа хранится в кольце
    pub key_ring_capacity: usize,

    /// Период ротации симметричного ключа
    /// По умолчанию: 24 часа
    pub key_rotation_interval: Duration,

    /// Пауза перед повтором после неудачной ротации
    /// По умолчанию: 15 минут
    pub key_rotation_retry_interval: Duration,

    /// Таймаут обращения к хранилищу ключей
    pub key_store_timeout: Duration,

    // ============================================
    // СООБЩЕНИЯ
    // ============================================

    /// Максимальная длина текста сообщения (в символах)
    pub max_message_length: usize,

    /// Что показывается вместо чувствительного фрагмента, который не удалось расшифровать
    pub sensitive_placeholder: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Криптография
            pbkdf2_iterations: MIN_PBKDF2_ITERATIONS,
            rsa_key_bits: 2048,

            // Ротация
            key_ring_capacity: 3,
            key_rotation_interval: Duration::from_secs(24 * 60 * 60),
            key_rotation_retry_interval: Duration::from_secs(15 * 60),
            key_store_timeout: Duration::from_secs(10),

            // Сообщения
            max_message_length: 5000,
            sensitive_placeholder: "[unable to decrypt]".to_string(),
        }
    }
}

impl Config {
    /// Создать конфигурацию из переменных окружения
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Переопределяем значения из env, если они заданы
        if let Ok(val) = std::env::var("PBKDF2_ITERATIONS") {
            if let Ok(parsed) = val.parse() {
                config.pbkdf2_iterations = parsed;
            }
        }

        if let Ok(val) = std::env::var("KEY_ROTATION_HOURS") {
            if let Some(interval) = val.parse().ok().and_then(hours) {
                config.key_rotation_interval = interval;
            }
        }

        if let Ok(val) = std::env::var("KEY_ROTATION_RETRY_MINUTES") {
            if let Some(interval) = val.parse().ok().and_then(minutes) {
                config.key_rotation_retry_interval = interval;
            }
        }

        if let Ok(val) = std::env::var("KEY_STORE_TIMEOUT_SECS") {
            if let Ok(parsed) = val.parse::<u64>() {
                config.key_store_timeout = Duration::from_secs(parsed);
            }
        }

        if let Ok(val) = std::env::var("RSA_KEY_BITS") {
            if let Ok(parsed) = val.parse() {
                config.rsa_key_bits = parsed;
            }
        }

        config
    }

    /// Проверить, что параметры не ослабляют криптографию
    pub fn validate(&self) -> Result<()> {
        if self.pbkdf2_iterations < MIN_PBKDF2_ITERATIONS {
            return Err(CollabError::Config(format!(
                "PBKDF2 iterations must be at least {}, got {}",
                MIN_PBKDF2_ITERATIONS, self.pbkdf2_iterations
            )));
        }
        if self.key_ring_capacity == 0 {
            return Err(CollabError::Config(
                "Key ring capacity must be at least 1".to_string(),
            ));
        }
        if self.rsa_key_bits < 2048 {
            return Err(CollabError::Config(format!(
                "RSA modulus must be at least 2048 bits, got {}",
                self.rsa_key_bits
            )));
        }
        if self.key_rotation_interval.is_zero() || self.key_rotation_retry_interval.is_zero() {
            return Err(CollabError::Config(
                "Rotation intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Получить глобальный экземпляр конфигурации
    ///
    /// Автоматически инициализирует конфигурацию со значениями по умолчанию при первом вызове
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::default)
    }

    /// Инициализировать глобальную конфигурацию со значениями по умолчанию
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init() -> Result<()> {
        Self::init_with(Self::default())
    }

    /// Инициализировать глобальную конфигурацию из переменных окружения
    ///
    /// # Errors
    ///
    /// `CollabError::Config`, если значения из окружения не проходят
    /// [`Config::validate`] или конфигурация уже инициализирована
    pub fn init_from_env() -> Result<()> {
        Self::init_with(Self::from_env())
    }

    /// Инициализировать глобальную конфигурацию с кастомным экземпляром
    ///
    /// Невалидная конфигурация не устанавливается.
    pub fn init_with(config: Config) -> Result<()> {
        config.validate()?;
        GLOBAL_CONFIG
            .set(config)
            .map_err(|_| CollabError::Config("Config already initialized".to_string()))
    }

    /// Проверить, инициализирована ли глобальная конфигурация
    pub fn is_initialized() -> bool {
        GLOBAL_CONFIG.get().is_some()
    }
}

/// Часы из окружения; переполнение игнорируется
fn hours(value: u64) -> Option<Duration> {
    value.checked_mul(60 * 60).map(Duration::from_secs)
}

fn minutes(value: u64) -> Option<Duration> {
    value.checked_mul(60).map(Duration::from_secs)
}

/// Секреты симметричного слоя: затравка кольца ключей и MAC-ключ.
///
/// Значения непрозрачные строки (как в конфигурации хоста); байты строки
/// используются как исходный материал для PBKDF2 и HMAC.
#[derive(Clone)]
pub struct CryptoSecrets {
    pub current_key: Zeroizing<String>,
    pub old_key_1: Option<Zeroizing<String>>,
    pub old_key_2: Option<Zeroizing<String>>,
    pub mac_key: Zeroizing<String>,
}

impl CryptoSecrets {
    pub fn new(current_key: &str, mac_key: &str) -> Self {
        Self {
            current_key: Zeroizing::new(current_key.to_string()),
            old_key_1: None,
            old_key_2: None,
            mac_key: Zeroizing::new(mac_key.to_string()),
        }
    }

    pub fn with_old_keys(mut self, old_key_1: Option<&str>, old_key_2: Option<&str>) -> Self {
        self.old_key_1 = old_key_1.map(|k| Zeroizing::new(k.to_string()));
        self.old_key_2 = old_key_2.map(|k| Zeroizing::new(k.to_string()));
        self
    }

    /// Загрузить секреты из окружения
    ///
    /// `CRYPTO_CURRENT_KEY` и `CRYPTO_MAC_KEY` обязательны,
    /// `CRYPTO_OLD_KEY_1` / `CRYPTO_OLD_KEY_2` опциональны.
    pub fn from_env() -> Result<Self> {
        let required = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CollabError::Config(format!("{} is not configured", name)))
        };
        let optional = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let secrets = Self::new(&required("CRYPTO_CURRENT_KEY")?, &required("CRYPTO_MAC_KEY")?)
            .with_old_keys(
                optional("CRYPTO_OLD_KEY_1").as_deref(),
                optional("CRYPTO_OLD_KEY_2").as_deref(),
            );
        secrets.validate()?;
        Ok(secrets)
    }

    /// Ключи кольца от старейшего к текущему
    pub fn ring_seeds(&self) -> Vec<Option<&str>> {
        vec![
            self.old_key_2.as_ref().map(|k| k.as_str()),
            self.old_key_1.as_ref().map(|k| k.as_str()),
            Some(self.current_key.as_str()),
        ]
    }

    /// Разделение ключей: MAC-ключ не может совпадать ни с одним ключом шифрования
    pub fn validate(&self) -> Result<()> {
        if self.current_key.is_empty() {
            return Err(CollabError::Config("Encryption key not configured".to_string()));
        }
        if self.mac_key.is_empty() {
            return Err(CollabError::Config("MAC key not configured".to_string()));
        }
        if self
            .ring_seeds()
            .into_iter()
            .flatten()
            .any(|seed| seed == self.mac_key.as_str())
        {
            return Err(CollabError::Config(
                "MAC key must differ from every encryption key".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for CryptoSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoSecrets")
            .field("current_key", &"<redacted>")
            .field("old_key_1", &self.old_key_1.as_ref().map(|_| "<redacted>"))
            .field("old_key_2", &self.old_key_2.as_ref().map(|_| "<redacted>"))
            .field("mac_key", &"<redacted>")
            .finish()
    }
}
