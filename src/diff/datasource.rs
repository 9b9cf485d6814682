use std::{cmp::Ordering, convert::Infallible};

/// The three inputs a diff can draw tokens from. Two-way diffs only use
/// `Original` and `Modified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasourceKind {
    Original,
    Modified,
    Latest,
}

impl DatasourceKind {
    pub(crate) fn index(self) -> usize {
        match self {
            DatasourceKind::Original => 0,
            DatasourceKind::Modified => 1,
            DatasourceKind::Latest => 2,
        }
    }
}

/// Supplies tokens to the diff engine, one source at a time.
///
/// The engine opens a source, pulls tokens until `next_token` returns
/// `None`, then closes it. Tokens equal to an already interned token (by
/// `compare`) are handed back through `discard_token` right away; the
/// remaining ones are released together through `discard_all_tokens` once the
/// diff is assembled. Errors are returned to the caller of `diff`/`diff3`
/// untouched.
pub trait Datasource {
    type Token;
    type Error;

    fn open(&mut self, _kind: DatasourceKind) -> Result<(), Self::Error> { Ok(()) }

    fn next_token(&mut self, kind: DatasourceKind) -> Result<Option<Self::Token>, Self::Error>;

    fn close(&mut self, _kind: DatasourceKind) -> Result<(), Self::Error> { Ok(()) }

    fn compare(&self, a: &Self::Token, b: &Self::Token) -> Ordering;

    fn discard_token(&mut self, _token: Self::Token) {}

    fn discard_all_tokens(&mut self) {}
}

/// Serves pre-split token sequences, e.g. sorted directory entries.
#[derive(Debug, Clone)]
pub struct SliceDatasource<T> {
    sources: [Vec<T>; 3],
    cursors: [usize; 3],
}

impl<T> SliceDatasource<T> {
    pub fn new(original: Vec<T>, modified: Vec<T>) -> Self {
        Self::new3(original, modified, Vec::new())
    }

    pub fn new3(original: Vec<T>, modified: Vec<T>, latest: Vec<T>) -> Self {
        SliceDatasource {
            sources: [original, modified, latest],
            cursors: [0; 3],
        }
    }

    pub fn source(&self, kind: DatasourceKind) -> &[T] { &self.sources[kind.index()] }
}

impl<T: Ord + Clone> Datasource for SliceDatasource<T> {
    type Token = T;
    type Error = Infallible;

    fn open(&mut self, kind: DatasourceKind) -> Result<(), Self::Error> {
        self.cursors[kind.index()] = 0;
        Ok(())
    }

    fn next_token(&mut self, kind: DatasourceKind) -> Result<Option<T>, Self::Error> {
        let index = kind.index();
        let token = self.sources[index].get(self.cursors[index]).cloned();
        if token.is_some() {
            self.cursors[index] += 1;
        }
        Ok(token)
    }

    fn compare(&self, a: &T, b: &T) -> Ordering { a.cmp(b) }
}
