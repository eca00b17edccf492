// Общие RSA-ключи для unit-тестов: генерация 2048-битного ключа дорогая,
// поэтому каждая пара создаётся один раз на тестовый бинарник

use crate::crypto::keys::KeyPair;
use crate::crypto::provider::KeyPairProvider;
use crate::crypto::suites::rsa_suite::RsaSuiteProvider;
use std::sync::OnceLock;

fn cached(cell: &'static OnceLock<KeyPair>) -> &'static KeyPair {
    cell.get_or_init(|| RsaSuiteProvider::generate_key_pair().unwrap())
}

pub fn alice() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    cached(&KEYS)
}

pub fn bob() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    cached(&KEYS)
}

pub fn carol() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    cached(&KEYS)
}
