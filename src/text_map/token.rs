/// A maximal run of word characters inside some text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    /// Start byte offset in the scanned text
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

/// Check if a character should be part of a token (`\w` semantics)
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split text into word tokens, left to right
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut current_start: Option<usize> = None;

    for (idx, c) in text.char_indices() {
        match (is_word_char(c), current_start) {
            (true, None) => current_start = Some(idx),
            (false, Some(start)) => {
                tokens.push(Token {
                    text: &text[start..idx],
                    start,
                    end: idx,
                });
                current_start = None;
            }
            _ => {}
        }
    }

    // Don't forget the last token
    if let Some(start) = current_start {
        tokens.push(Token {
            text: &text[start..],
            start,
            end: text.len(),
        });
    }

    tokens
}

/// True when `term` (ignoring surrounding whitespace) is exactly one token
pub fn is_single_token(term: &str) -> bool {
    let trimmed = term.trim();
    !trimmed.is_empty() && trimmed.chars().all(is_word_char)
}
