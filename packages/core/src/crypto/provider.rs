//! Defines the KeyPairProvider trait for the asymmetric layer.

use crate::crypto::keys::KeyPair;
use crate::crypto::SuiteID;
use crate::error::CryptoError;

/// Trait that formalizes all asymmetric operations for a specific cipher suite.
///
/// Keys cross this boundary as encoded bytes (the same bytes the user record
/// stores), so callers never depend on a concrete key type.
pub trait KeyPairProvider: Send + Sync + 'static {
    /// Generates a new key pair.
    ///
    /// Fails with [`CryptoError::KeyGenerationError`] only when the entropy
    /// source fails; callers must not retry in-process.
    fn generate_key_pair() -> Result<KeyPair, CryptoError>;

    /// Encrypts `plaintext` for the holder of `public_key` using an
    /// IND-CCA2 padding mode.
    fn encrypt_with_public_key(plaintext: &[u8], public_key: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Reverses [`encrypt_with_public_key`](Self::encrypt_with_public_key).
    /// Wrong keys and truncated input are errors, never garbage output.
    fn decrypt_with_private_key(ciphertext: &[u8], private_key: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Signs `data` with the given private key.
    fn sign(private_key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Verifies a signature with the given public key.
    fn verify(public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<(), CryptoError>;

    /// Maximum plaintext length accepted by `encrypt_with_public_key` for this key.
    fn max_plaintext_len(public_key: &[u8]) -> Result<usize, CryptoError>;

    /// Returns the SuiteID associated with this provider.
    fn suite_id() -> SuiteID;
}
