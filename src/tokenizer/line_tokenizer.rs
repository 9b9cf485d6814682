use super::token::Token;

/// Splits text into lines, keeping each line terminator attached to its
/// line. A trailing line without a terminator is its own token, so `"a"` and
/// `"a\n"` never compare equal.
///
/// ## Example
///
/// ```not_rust
/// "Hello\nWorld!" -> ["Hello\n", "World!"]
/// "Line 1\r\nLine 2\n" -> ["Line 1\r\n", "Line 2\n"]
/// ```
pub fn line_tokenizer(text: &str) -> Vec<Token<String>> {
    text.split_inclusive('\n').map(Token::from).collect()
}
