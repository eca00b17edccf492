//! Криптографические наборы (Crypto Suites)
//!
//! Этот модуль содержит реализации KeyPairProvider trait.
//!
//! ## Доступные наборы
//!
//! ### RSA Suite (текущий)
//! - **Encryption**: RSA-2048 OAEP-SHA256
//! - **Signatures**: RSA-PSS-SHA256
//! - **Key encoding**: PKCS#1 DER (base64 в записи пользователя)
//! - **Suite ID**: 1
//!
//! ## Выбор suite
//!
//! ```rust,ignore
//! use collab_core::crypto::suites::rsa_suite::RsaSuiteProvider;
//! use collab_core::crypto::provider::KeyPairProvider;
//!
//! type MySuite = RsaSuiteProvider;
//!
//! // Генерация ключей
//! let pair = MySuite::generate_key_pair()?;
//! ```

pub mod rsa_suite;
