// Асимметричные пары ключей пользователей
// Одна пара на пользователя, выдаётся при регистрации и больше не меняется

use crate::error::CryptoError;
use crate::utils::b64;
use std::fmt;
use zeroize::Zeroizing;

/// Пара ключей в закодированном виде (PKCS#1 DER для RSA suite)
#[derive(Clone)]
pub struct KeyPair {
    pub public_key: Vec<u8>,
    pub private_key: Zeroizing<Vec<u8>>,
}

impl KeyPair {
    pub fn new(public_key: Vec<u8>, private_key: Vec<u8>) -> Self {
        Self {
            public_key,
            private_key: Zeroizing::new(private_key),
        }
    }

    /// Восстановить из base64-строк записи пользователя
    pub fn from_base64(public_key: &str, private_key: &str) -> Result<Self, CryptoError> {
        Ok(Self::new(b64::decode(public_key)?, b64::decode(private_key)?))
    }

    pub fn public_key_base64(&self) -> String {
        b64::encode(&self.public_key)
    }

    pub fn private_key_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(b64::encode(&self.private_key))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_base64())
            .field("private_key", &"<redacted>")
            .finish()
    }
}
