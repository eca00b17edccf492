// Разметка чувствительных фрагментов внутри текста сообщения
//
// При отправке первый фрагмент `[sensitive]...[/sensitive]` заменяется на
// `[encrypted]<base64>[/encrypted]`. При чтении каждый `[encrypted]` фрагмент
// расшифровывается отдельно, а неудачный заменяется плейсхолдером.

pub const SENSITIVE_OPEN: &str = "[sensitive]";
pub const SENSITIVE_CLOSE: &str = "[/sensitive]";
pub const ENCRYPTED_OPEN: &str = "[encrypted]";
pub const ENCRYPTED_CLOSE: &str = "[/encrypted]";

/// Текст, разрезанный вокруг первого чувствительного фрагмента
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensitiveSpan<'a> {
    pub before: &'a str,
    pub content: &'a str,
    pub after: &'a str,
}

impl<'a> SensitiveSpan<'a> {
    /// Собрать текст обратно, подставив зашифрованный фрагмент вместо разметки
    pub fn splice_encrypted(&self, encrypted: &str) -> String {
        let mut out = String::with_capacity(
            self.before.len()
                + ENCRYPTED_OPEN.len()
                + encrypted.len()
                + ENCRYPTED_CLOSE.len()
                + self.after.len(),
        );
        out.push_str(self.before);
        out.push_str(ENCRYPTED_OPEN);
        out.push_str(encrypted);
        out.push_str(ENCRYPTED_CLOSE);
        out.push_str(self.after);
        out
    }
}

/// Первый закрытый фрагмент `[sensitive]...[/sensitive]`, если есть
pub fn find_sensitive_span(text: &str) -> Option<SensitiveSpan<'_>> {
    let open = text.find(SENSITIVE_OPEN)?;
    let content_start = open + SENSITIVE_OPEN.len();
    let close = content_start + text[content_start..].find(SENSITIVE_CLOSE)?;

    Some(SensitiveSpan {
        before: &text[..open],
        content: &text[content_start..close],
        after: &text[close + SENSITIVE_CLOSE.len()..],
    })
}

/// Заменить каждый `[encrypted]...[/encrypted]` результатом `decrypt`.
///
/// `None` от `decrypt` превращается в `placeholder`; остальной текст не
/// трогается. Незакрытый `[encrypted]` остаётся как есть.
pub fn replace_encrypted_spans<F>(text: &str, placeholder: &str, mut decrypt: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find(ENCRYPTED_OPEN) {
        let content_start = open + ENCRYPTED_OPEN.len();
        let Some(close_offset) = rest[content_start..].find(ENCRYPTED_CLOSE) else {
            break;
        };
        let close = content_start + close_offset;

        out.push_str(&rest[..open]);
        match decrypt(&rest[content_start..close]) {
            Some(plaintext) => out.push_str(&plaintext),
            None => out.push_str(placeholder),
        }
        rest = &rest[close + ENCRYPTED_CLOSE.len()..];
    }

    out.push_str(rest);
    out
}

/// Количество `[encrypted]` фрагментов в тексте
pub fn count_encrypted_spans(text: &str) -> usize {
    let mut count = 0;
    replace_encrypted_spans(text, "", |_| {
        count += 1;
        None
    });
    count
}
