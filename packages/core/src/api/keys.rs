// Выдача ключей при регистрации пользователя

use crate::crypto::provider::KeyPairProvider;
use crate::storage::models::User;
use crate::utils::error::Result;
use tracing::info;

/// Сгенерировать пару ключей и записать её в пользователя (base64 PKCS#1).
///
/// Пара выдаётся один раз: у пользователя с ключами она не перевыпускается.
pub fn register_user_keys<P: KeyPairProvider>(user: User) -> Result<User> {
    if user.public_key.is_some() && user.private_key.is_some() {
        return Ok(user);
    }

    let pair = P::generate_key_pair()?;
    info!(
        target: "api::keys",
        user_id = %user.id,
        suite_id = P::suite_id(),
        "Key pair issued"
    );
    Ok(user.with_keys(pair.public_key_base64(), pair.private_key_base64().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::suites::rsa_suite::RsaSuiteProvider;
    use uuid::Uuid;

    #[test]
    fn test_register_user_keys() {
        let user = register_user_keys::<RsaSuiteProvider>(User::new(Uuid::new_v4(), "a@example.com")).unwrap();

        let public_key = user.public_key_bytes().unwrap().unwrap();
        let private_key = user.private_key_bytes().unwrap().unwrap();
        let ciphertext = RsaSuiteProvider::encrypt_with_public_key(b"x", &public_key).unwrap();
        assert_eq!(
            RsaSuiteProvider::decrypt_with_private_key(&ciphertext, &private_key).unwrap(),
            b"x"
        );

        // Повторная регистрация не меняет ключи
        let again = register_user_keys::<RsaSuiteProvider>(user.clone()).unwrap();
        assert_eq!(again.public_key, user.public_key);
    }
}
