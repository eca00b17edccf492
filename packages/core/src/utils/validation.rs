use crate::config::Config;
use crate::utils::error::{CollabError, Result};

// Подстроки, которые никогда не допускаются в тексте сообщения
const DANGEROUS_PATTERNS: [&str; 6] = [
    "<script>",
    "javascript:",
    "data:",
    "vbscript:",
    "onload=",
    "onerror=",
];

/// Экранирует HTML-разметку во входном тексте.
///
/// `&` заменяется первым, иначе уже экранированные сущности
/// экранировались бы повторно. Пустой или пробельный ввод даёт пустую строку.
pub fn sanitize_input(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }

    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn is_valid_content(content: &str) -> bool {
    if content.trim().is_empty() {
        return true;
    }

    let lowered = content.to_lowercase();
    content.chars().count() <= Config::global().max_message_length
        && !DANGEROUS_PATTERNS.iter().any(|p| lowered.contains(p))
}

/// Проверка текста сообщения перед шифрованием
pub fn validate_message_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(CollabError::Validation(
            "Message content cannot be empty".to_string(),
        ));
    }

    if !is_valid_content(content) {
        return Err(CollabError::Validation(format!(
            "Message content must be at most {} characters and contain no active markup",
            Config::global().max_message_length
        )));
    }

    Ok(())
}
