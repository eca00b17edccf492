//! Tests for the cryptographic primitives
//!
//! This test suite covers:
//! - RSA Suite Provider (OAEP encryption, PSS signatures, PKCS#1 keys)
//! - Symmetric cipher (PBKDF2 + AES-256-GCM blob layout)
//! - MAC and signature services
//! - Error Handling

use collab_core::crypto::integrity::{MacService, SignatureService};
use collab_core::crypto::keys::KeyPair;
use collab_core::crypto::provider::KeyPairProvider;
use collab_core::crypto::suites::rsa_suite::RsaSuiteProvider;
use collab_core::crypto::symmetric::{SymmetricCipher, HEADER_LENGTH, SALT_LENGTH};
use collab_core::error::CryptoError;
use std::sync::OnceLock;

fn alice() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    KEYS.get_or_init(|| RsaSuiteProvider::generate_key_pair().unwrap())
}

fn bob() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    KEYS.get_or_init(|| RsaSuiteProvider::generate_key_pair().unwrap())
}

/// Test that generated key pairs are distinct and decodable from base64
#[test]
fn test_rsa_suite_generate_key_pair() {
    assert_ne!(
        alice().public_key,
        bob().public_key,
        "Two generated key pairs must differ"
    );

    let restored = KeyPair::from_base64(
        &alice().public_key_base64(),
        &alice().private_key_base64(),
    )
    .unwrap();
    assert_eq!(restored.public_key, alice().public_key);
}

/// Test OAEP encryption round-trip and its length limit
#[test]
fn test_rsa_suite_encrypt_decrypt() {
    let ciphertext = RsaSuiteProvider::encrypt_with_public_key(b"pin 1234", &bob().public_key).unwrap();
    assert_eq!(ciphertext.len(), 256, "RSA-2048 ciphertext should be 256 bytes");

    let plaintext = RsaSuiteProvider::decrypt_with_private_key(&ciphertext, &bob().private_key).unwrap();
    assert_eq!(plaintext, b"pin 1234");

    let limit = RsaSuiteProvider::max_plaintext_len(&bob().public_key).unwrap();
    assert_eq!(limit, 190, "OAEP-SHA256 limit for 2048-bit keys");
    assert!(RsaSuiteProvider::encrypt_with_public_key(&vec![b'a'; limit], &bob().public_key).is_ok());
    assert!(matches!(
        RsaSuiteProvider::encrypt_with_public_key(&vec![b'a'; limit + 1], &bob().public_key),
        Err(CryptoError::InvalidInputError(_))
    ));
}

/// Test that decryption with the wrong private key fails instead of returning garbage
#[test]
fn test_rsa_suite_decrypt_with_wrong_key() {
    let ciphertext = RsaSuiteProvider::encrypt_with_public_key(b"secret", &bob().public_key).unwrap();
    let result = RsaSuiteProvider::decrypt_with_private_key(&ciphertext, &alice().private_key);
    assert!(result.is_err(), "Wrong private key must not decrypt");
}

/// Test signature creation and verification
#[test]
fn test_rsa_suite_sign_verify() {
    let message = b"ciphertext bytes";
    let signature = RsaSuiteProvider::sign(&alice().private_key, message).unwrap();

    assert!(
        RsaSuiteProvider::verify(&alice().public_key, message, &signature).is_ok(),
        "Signature verification failed"
    );
    assert!(
        RsaSuiteProvider::verify(&bob().public_key, message, &signature).is_err(),
        "Verification should fail with another public key"
    );
    assert!(
        RsaSuiteProvider::verify(&alice().public_key, b"modified", &signature).is_err(),
        "Verification should fail with wrong message"
    );
}

/// Test that malformed keys are rejected
#[test]
fn test_rsa_suite_invalid_keys() {
    assert!(matches!(
        RsaSuiteProvider::encrypt_with_public_key(b"x", b"not a key"),
        Err(CryptoError::InvalidKeyError(_))
    ));
    assert!(matches!(
        RsaSuiteProvider::sign(b"not a key", b"x"),
        Err(CryptoError::InvalidKeyError(_))
    ));
}

/// Test the blob layout: salt || iv || ciphertext || tag
#[test]
fn test_symmetric_blob_layout() {
    let cipher = SymmetricCipher::new();
    let blob = cipher.encrypt(b"Hej 1", b"test-key").unwrap();

    assert_eq!(HEADER_LENGTH, 32, "salt and iv take the first 32 bytes");
    assert_eq!(blob.len(), HEADER_LENGTH + 5 + 16);

    let plaintext = cipher.decrypt(&blob, b"test-key").unwrap();
    assert_eq!(plaintext.as_slice(), b"Hej 1");

    assert!(matches!(
        cipher.decrypt(&blob, b"wrong-key"),
        Err(CryptoError::DecryptionError(_))
    ));
}

/// Test that every encryption uses a fresh salt and IV
#[test]
fn test_symmetric_fresh_salt_and_iv() {
    let cipher = SymmetricCipher::new();
    let first = cipher.encrypt(b"same", b"test-key").unwrap();
    let second = cipher.encrypt(b"same", b"test-key").unwrap();

    assert_ne!(first[..SALT_LENGTH], second[..SALT_LENGTH]);
    assert_ne!(first[SALT_LENGTH..HEADER_LENGTH], second[SALT_LENGTH..HEADER_LENGTH]);
    assert_ne!(first, second);
}

/// Test that too few PBKDF2 iterations are refused
#[test]
fn test_symmetric_minimum_iterations() {
    assert!(SymmetricCipher::with_iterations(1_000).is_err());
    assert_eq!(SymmetricCipher::with_iterations(20_000).unwrap().iterations(), 20_000);
}

/// Test MAC and signature services over a ciphertext string
#[test]
fn test_integrity_services() {
    let mac = MacService::new(b"mac-key").unwrap();
    let signatures = SignatureService::<RsaSuiteProvider>::new();
    let ciphertext = "wUAAAAAAAAACAAAA";

    let tag = mac.generate_mac(ciphertext.as_bytes()).unwrap();
    let signature = signatures.sign(ciphertext.as_bytes(), &alice().private_key).unwrap();

    assert!(mac.verify_mac(ciphertext.as_bytes(), &tag));
    assert!(signatures.verify(ciphertext.as_bytes(), &signature, &alice().public_key));

    assert!(!mac.verify_mac(b"wUAAAAAAAAACAAAB", &tag));
    assert!(!signatures.verify(b"wUAAAAAAAAACAAAB", &signature, &alice().public_key));
}
