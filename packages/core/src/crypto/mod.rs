//! Криптографический модуль
//!
//! # Архитектура
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 MessageService (api::messaging)             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HybridMessageCodec                       │
//! │  - Чувствительный фрагмент → RSA-OAEP получателя            │
//! │  - Весь текст → AES-GCM текущим поколением кольца           │
//! │  - HMAC + подпись над шифротекстом                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼──────────────────────┐
//!        ▼                     ▼                      ▼
//! ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐
//! │ SymmetricCipher  │ │ IntegrityService │ │  KeyPairProvider     │
//! │ + KeyRing        │ │ - MacService     │ │  (RSA suite)         │
//! │ - PBKDF2 + GCM   │ │ - Signatures     │ │  - OAEP / PSS        │
//! └──────────────────┘ └──────────────────┘ └──────────────────────┘
//!        ▲
//!        │ атомарная подмена кольца
//! ┌──────────────────┐
//! │ KeyRotation-     │
//! │ Scheduler        │
//! └──────────────────┘
//! ```
//!
//! ## Модули
//!
//! ### Core Traits
//! - [`provider`]: KeyPairProvider trait для crypto-agility
//!
//! ### Implementations
//! - [`suites`]: Реализации KeyPairProvider (RSA)
//! - [`symmetric`]: PBKDF2 + AES-256-GCM
//! - [`key_ring`]: Кольцо поколений симметричного ключа
//! - [`integrity`]: HMAC и цифровые подписи
//! - [`sensitive`]: Разметка `[sensitive]` / `[encrypted]`
//!
//! ### High-Level APIs
//! - [`codec`]: Полный конвейер отправки и чтения
//! - [`rotation`]: Ротация ключей и фоновый планировщик
//!
//! ### Utilities
//! - [`keys`]: Пара ключей пользователя

// ============================================================================
// Core Traits
// ============================================================================

/// KeyPairProvider trait для crypto-agility
pub mod provider;

// ============================================================================
// Implementations
// ============================================================================

/// Криптографические наборы
pub mod suites;

pub mod symmetric;

pub mod key_ring;

pub mod integrity;

pub mod sensitive;

// ============================================================================
// High-Level APIs
// ============================================================================

/// Гибридный кодек сообщений
pub mod codec;

/// Ротация симметричных ключей
pub mod rotation;

// ============================================================================
// Utilities
// ============================================================================

pub mod keys;

#[cfg(test)]
pub(crate) mod test_support;

// ============================================================================
// Re-exports для удобства
// ============================================================================

pub use codec::{HybridMessageCodec, Recipient};
pub use integrity::{MacService, SignatureService};
pub use key_ring::{KeyRing, SharedKeyRing, SymmetricKey};
pub use keys::KeyPair;
pub use provider::KeyPairProvider;
pub use rotation::{KeyRotationScheduler, KeyRotationService, RotationHandle};
pub use suites::rsa_suite::RsaSuiteProvider;
pub use symmetric::SymmetricCipher;

pub type SuiteID = u16;
