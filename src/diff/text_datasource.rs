use std::{cmp::Ordering, convert::Infallible};

use super::datasource::{Datasource, DatasourceKind};
use crate::tokenizer::{Tokenizer, token::Token};

/// Serves in-memory texts split by a tokenizer. Tokens handed to the engine
/// are references into the datasource, so nothing is copied while
/// interning.
#[derive(Debug, Clone)]
pub struct TextDatasource {
    sources: [Vec<Token<String>>; 3],
    cursors: [usize; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRef {
    kind: DatasourceKind,
    index: usize,
}

impl TextDatasource {
    pub fn new(original: &str, modified: &str, tokenizer: &Tokenizer<String>) -> Self {
        Self::new3(original, modified, "", tokenizer)
    }

    pub fn new3(
        original: &str,
        modified: &str,
        latest: &str,
        tokenizer: &Tokenizer<String>,
    ) -> Self {
        TextDatasource {
            sources: [tokenizer(original), tokenizer(modified), tokenizer(latest)],
            cursors: [0; 3],
        }
    }

    pub fn tokens(&self, kind: DatasourceKind) -> &[Token<String>] {
        &self.sources[kind.index()]
    }

    fn resolve(&self, token: TokenRef) -> &Token<String> {
        &self.sources[token.kind.index()][token.index]
    }
}

impl Datasource for TextDatasource {
    type Token = TokenRef;
    type Error = Infallible;

    fn open(&mut self, kind: DatasourceKind) -> Result<(), Self::Error> {
        self.cursors[kind.index()] = 0;
        Ok(())
    }

    fn next_token(&mut self, kind: DatasourceKind) -> Result<Option<TokenRef>, Self::Error> {
        let cursor = &mut self.cursors[kind.index()];
        if *cursor >= self.sources[kind.index()].len() {
            return Ok(None);
        }

        let token = TokenRef {
            kind,
            index: *cursor,
        };
        *cursor += 1;
        Ok(Some(token))
    }

    fn compare(&self, a: &TokenRef, b: &TokenRef) -> Ordering { self.resolve(*a).cmp(self.resolve(*b)) }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::BuiltinTokenizer;

    #[test]
    fn test_serves_tokens_in_order_and_reopens() {
        let mut datasource = TextDatasource::new("a\nb\n", "b\n", &*BuiltinTokenizer::Line);

        datasource.open(DatasourceKind::Original).unwrap();
        let first = datasource.next_token(DatasourceKind::Original).unwrap().unwrap();
        let second = datasource.next_token(DatasourceKind::Original).unwrap().unwrap();
        assert_eq!(datasource.next_token(DatasourceKind::Original).unwrap(), None);

        let modified = datasource.next_token(DatasourceKind::Modified).unwrap().unwrap();
        assert_eq!(datasource.compare(&second, &modified), Ordering::Equal);
        assert_eq!(datasource.compare(&first, &modified), Ordering::Less);

        datasource.open(DatasourceKind::Original).unwrap();
        assert_eq!(
            datasource.next_token(DatasourceKind::Original).unwrap(),
            Some(first)
        );
    }
}
