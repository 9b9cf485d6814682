use super::token::Token;

/// Splits text into UTF-8 characters.
///
/// ```not_rust
/// "Hey!" -> ["H", "e", "y", "!"]
/// ```
pub fn character_tokenizer(text: &str) -> Vec<Token<String>> {
    text.chars()
        .map(|char| Token::new(char.to_string(), char.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_character_tokenizer() {
        assert!(character_tokenizer("").is_empty());

        let tokens = character_tokenizer("héj");
        let originals = tokens.iter().map(Token::original).collect::<Vec<_>>();
        assert_eq!(originals, ["h", "é", "j"]);
    }
}
