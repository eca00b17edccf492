use crate::config::Config;
use crate::crypto::keys::KeyPair;
use crate::crypto::provider::KeyPairProvider;
use crate::crypto::SuiteID;
use crate::error::CryptoError;
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pss::{BlindedSigningKey, Signature, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

// OAEP-SHA256: k - 2*hLen - 2
const OAEP_SHA256_OVERHEAD: usize = 2 * 32 + 2;

/// Suite ID for RSA-OAEP-SHA256 / RSA-PSS-SHA256
pub const RSA_SUITE_ID: SuiteID = 1;

/// Concrete implementation of `KeyPairProvider` on RSA.
///
/// - encryption: RSAES-OAEP with SHA-256 (raw RSA is never used)
/// - signatures: RSASSA-PSS with SHA-256
/// - key encoding: PKCS#1 DER
pub struct RsaSuiteProvider;

impl RsaSuiteProvider {
    fn public_key_from_der(public_key: &[u8]) -> Result<RsaPublicKey, CryptoError> {
        RsaPublicKey::from_pkcs1_der(public_key)
            .map_err(|e| CryptoError::InvalidKeyError(format!("Invalid RSA public key: {}", e)))
    }

    fn private_key_from_der(private_key: &[u8]) -> Result<RsaPrivateKey, CryptoError> {
        RsaPrivateKey::from_pkcs1_der(private_key)
            .map_err(|e| CryptoError::InvalidKeyError(format!("Invalid RSA private key: {}", e)))
    }
}

impl KeyPairProvider for RsaSuiteProvider {
    fn generate_key_pair() -> Result<KeyPair, CryptoError> {
        let bits = Config::global().rsa_key_bits;
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| CryptoError::KeyGenerationError(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);

        let public_der = public_key
            .to_pkcs1_der()
            .map_err(|e| CryptoError::EncodingError(format!("Failed to encode public key: {}", e)))?;
        let private_der = private_key
            .to_pkcs1_der()
            .map_err(|e| CryptoError::EncodingError(format!("Failed to encode private key: {}", e)))?;

        Ok(KeyPair::new(
            public_der.as_bytes().to_vec(),
            private_der.as_bytes().to_vec(),
        ))
    }

    fn encrypt_with_public_key(plaintext: &[u8], public_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = Self::public_key_from_der(public_key)?;
        let max_len = key.size().saturating_sub(OAEP_SHA256_OVERHEAD);
        if plaintext.len() > max_len {
            return Err(CryptoError::InvalidInputError(format!(
                "Plaintext too long for RSA-OAEP: {} bytes, limit {}",
                plaintext.len(),
                max_len
            )));
        }

        key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
            .map_err(|e| CryptoError::EncryptionError(e.to_string()))
    }

    fn decrypt_with_private_key(ciphertext: &[u8], private_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = Self::private_key_from_der(private_key)?;
        key.decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map_err(|e| CryptoError::DecryptionError(e.to_string()))
    }

    fn sign(private_key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = Self::private_key_from_der(private_key)?;
        let signing_key = BlindedSigningKey::<Sha256>::new(key);
        let signature = signing_key
            .try_sign_with_rng(&mut OsRng, data)
            .map_err(|e| CryptoError::SigningError(e.to_string()))?;
        Ok(signature.to_vec())
    }

    fn verify(public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let key = Self::public_key_from_der(public_key)?;
        let verifying_key = VerifyingKey::<Sha256>::new(key);
        let signature = Signature::try_from(signature)
            .map_err(|e| CryptoError::InvalidInputError(format!("Invalid signature: {}", e)))?;

        verifying_key
            .verify(data, &signature)
            .map_err(|e| CryptoError::SignatureVerificationError(e.to_string()))
    }

    fn max_plaintext_len(public_key: &[u8]) -> Result<usize, CryptoError> {
        let key = Self::public_key_from_der(public_key)?;
        Ok(key.size().saturating_sub(OAEP_SHA256_OVERHEAD))
    }

    fn suite_id() -> SuiteID {
        RSA_SUITE_ID
    }
}
