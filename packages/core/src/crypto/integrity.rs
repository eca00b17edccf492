// Целостность: HMAC-SHA256 над шифротекстом + цифровая подпись автора
//
// И MAC, и подпись считаются над шифротекстом, а не над открытым текстом,
// поэтому проверка возможна без симметричного ключа.

use crate::config::CryptoSecrets;
use crate::crypto::provider::KeyPairProvider;
use crate::error::CryptoError;
use crate::utils::b64;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::marker::PhantomData;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Генерация и проверка MAC отдельным ключом (не ключом шифрования)
#[derive(Clone)]
pub struct MacService {
    key: Zeroizing<Vec<u8>>,
}

impl MacService {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.is_empty() {
            return Err(CryptoError::InvalidKeyError(
                "MAC key cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            key: Zeroizing::new(key.to_vec()),
        })
    }

    pub fn from_secrets(secrets: &CryptoSecrets) -> Result<Self, CryptoError> {
        Self::new(secrets.mac_key.as_bytes())
    }

    fn keyed(&self) -> Result<HmacSha256, CryptoError> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|e| CryptoError::InvalidKeyError(e.to_string()))
    }

    /// MAC сообщения в base64
    pub fn generate_mac(&self, message: &[u8]) -> Result<String, CryptoError> {
        let mut mac = self.keyed()?;
        mac.update(message);
        Ok(b64::encode(&mac.finalize().into_bytes()))
    }

    /// Сравнение за постоянное время; некорректный base64 это просто несовпадение
    pub fn verify_mac(&self, message: &[u8], expected_mac: &str) -> bool {
        let Ok(tag) = b64::decode(expected_mac) else {
            return false;
        };
        let Ok(mut mac) = self.keyed() else {
            return false;
        };
        mac.update(message);
        mac.verify_slice(&tag).is_ok()
    }
}

impl fmt::Debug for MacService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacService").field("key", &"<redacted>").finish()
    }
}

/// Подпись шифротекста закрытым ключом отправителя
pub struct SignatureService<P: KeyPairProvider> {
    _phantom: PhantomData<P>,
}

impl<P: KeyPairProvider> SignatureService<P> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }

    /// Подпись в base64
    pub fn sign(&self, data: &[u8], private_key: &[u8]) -> Result<String, CryptoError> {
        let signature = P::sign(private_key, data)?;
        Ok(b64::encode(&signature))
    }

    /// `true` только для подписи, сделанной парным закрытым ключом
    pub fn verify(&self, data: &[u8], signature: &str, public_key: &[u8]) -> bool {
        match b64::decode(signature) {
            Ok(signature) => P::verify(public_key, data, &signature).is_ok(),
            Err(_) => false,
        }
    }
}

impl<P: KeyPairProvider> Default for SignatureService<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: KeyPairProvider> Clone for SignatureService<P> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<P: KeyPairProvider> fmt::Debug for SignatureService<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureService")
            .field("suite_id", &P::suite_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::suites::rsa_suite::RsaSuiteProvider;
    use crate::crypto::test_support::{alice, bob};

    #[test]
    fn test_mac_round_trip() {
        let service = MacService::new(b"mac-key").unwrap();
        let tag = service.generate_mac(b"ciphertext").unwrap();

        assert!(service.verify_mac(b"ciphertext", &tag));
        // 32 байта HMAC-SHA256 → 44 символа base64
        assert_eq!(tag.len(), 44);
    }

    #[test]
    fn test_mac_detects_bit_flip_in_message() {
        let service = MacService::new(b"mac-key").unwrap();
        let message = b"ciphertext".to_vec();
        let tag = service.generate_mac(&message).unwrap();

        for byte in 0..message.len() {
            for bit in 0..8 {
                let mut tampered = message.clone();
                tampered[byte] ^= 1 << bit;
                assert!(!service.verify_mac(&tampered, &tag));
            }
        }
    }

    #[test]
    fn test_mac_detects_bit_flip_in_tag() {
        let service = MacService::new(b"mac-key").unwrap();
        let tag = b64::decode(&service.generate_mac(b"ciphertext").unwrap()).unwrap();

        for byte in 0..tag.len() {
            let mut tampered = tag.clone();
            tampered[byte] ^= 0x80;
            assert!(!service.verify_mac(b"ciphertext", &b64::encode(&tampered)));
        }
    }

    #[test]
    fn test_mac_key_matters() {
        let tag = MacService::new(b"key-a").unwrap().generate_mac(b"m").unwrap();
        assert!(!MacService::new(b"key-b").unwrap().verify_mac(b"m", &tag));
    }

    #[test]
    fn test_mac_rejects_malformed_tag() {
        let service = MacService::new(b"mac-key").unwrap();
        assert!(!service.verify_mac(b"m", "***"));
        assert!(!service.verify_mac(b"m", ""));
    }

    #[test]
    fn test_empty_mac_key_rejected() {
        assert!(MacService::new(b"").is_err());
    }

    #[test]
    fn test_signature_binding() {
        let service = SignatureService::<RsaSuiteProvider>::new();
        let signature = service.sign(b"ciphertext", &alice().private_key).unwrap();

        assert!(service.verify(b"ciphertext", &signature, &alice().public_key));
        assert!(!service.verify(b"ciphertext", &signature, &bob().public_key));
        assert!(!service.verify(b"other", &signature, &alice().public_key));
        assert!(!service.verify(b"ciphertext", "not-base64!", &alice().public_key));
    }
}
