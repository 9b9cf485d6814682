use std::ops::Deref;

use serde::{Deserialize, Serialize};
use token::Token;

pub mod character_tokenizer;
pub mod line_tokenizer;
pub mod token;
pub mod word_tokenizer;

/// A tokenizer takes a string and returns the list of tokens the diff engine
/// compares.
pub type Tokenizer<T> = dyn Fn(&str) -> Vec<Token<T>>;

/// The tokenizers shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinTokenizer {
    /// One token per line, line terminator included.
    #[default]
    Line,
    Word,
    Character,
}

impl Deref for BuiltinTokenizer {
    type Target = Tokenizer<String>;

    fn deref(&self) -> &Self::Target {
        match self {
            BuiltinTokenizer::Line => &line_tokenizer::line_tokenizer,
            BuiltinTokenizer::Word => &word_tokenizer::word_tokenizer,
            BuiltinTokenizer::Character => &character_tokenizer::character_tokenizer,
        }
    }
}
