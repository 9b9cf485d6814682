use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::delta::Md5Digest;

/// Content-addressed store of base texts.
#[derive(Debug, Clone, Default)]
pub struct PristineStore {
    texts: BTreeMap<Md5Digest, Vec<u8>>,
}

impl PristineStore {
    pub fn new() -> Self { Self::default() }

    /// Stores `text`, returning its digest. Installing a text twice keeps a
    /// single copy.
    pub fn install(&mut self, text: Vec<u8>) -> Md5Digest {
        let digest = Md5Digest::of(&text);
        self.texts.entry(digest).or_insert(text);
        digest
    }

    pub fn read(&self, digest: &Md5Digest) -> Option<&[u8]> { self.texts.get(digest).map(Vec::as_slice) }

    pub fn contains(&self, digest: &Md5Digest) -> bool { self.texts.contains_key(digest) }

    pub fn len(&self) -> usize { self.texts.len() }

    pub fn is_empty(&self) -> bool { self.texts.is_empty() }

    /// Drops every text not in `referenced`, returning how many were
    /// dropped.
    pub fn remove_unreferenced(&mut self, referenced: &BTreeSet<Md5Digest>) -> usize {
        let before = self.texts.len();
        self.texts.retain(|digest, _| referenced.contains(digest));

        let removed = before - self.texts.len();
        debug!(removed, kept = self.texts.len(), "Removed unreferenced pristine texts");
        removed
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_install_read_and_collect() {
        let mut store = PristineStore::new();
        let hello = store.install(b"hello".to_vec());
        let again = store.install(b"hello".to_vec());
        let other = store.install(b"other".to_vec());

        assert_eq!(hello, again);
        assert_eq!(store.len(), 2);
        assert_eq!(store.read(&hello), Some(&b"hello"[..]));

        let removed = store.remove_unreferenced(&BTreeSet::from([other]));
        assert_eq!(removed, 1);
        assert!(!store.contains(&hello));
        assert!(store.contains(&other));
    }
}
