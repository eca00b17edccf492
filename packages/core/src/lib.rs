// Collab Core
// Конфиденциальность и целостность сообщений совместных пространств

#![warn(clippy::all)]

// Модули
pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod storage;
pub mod utils;

// Re-exports для удобства
pub use api::MessageService;
pub use config::{Config, CryptoSecrets};
pub use crypto::{HybridMessageCodec, KeyRotationScheduler, KeyRotationService, RsaSuiteProvider};
pub use storage::models::EncryptedMessage;
pub use utils::error::{CollabError, Result};
