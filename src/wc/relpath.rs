use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::wc_error::WcError;

/// A `/`-separated path relative to a working copy or repository root. The
/// root itself is the empty path.
///
/// Paths order component by component, so a node is immediately followed by
/// all of its descendants: `a` < `a/b` < `a/b/c` < `a.txt`.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelPath(String);

impl RelPath {
    pub fn root() -> Self { RelPath(String::new()) }

    pub fn new(path: &str) -> Result<Self, WcError> {
        let valid = path.is_empty()
            || path
                .split('/')
                .all(|component| !component.is_empty() && component != "." && component != "..");

        if valid {
            Ok(RelPath(path.to_owned()))
        } else {
            Err(WcError::InvalidPath(path.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn is_root(&self) -> bool { self.0.is_empty() }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|component| !component.is_empty())
    }

    pub fn parent(&self) -> Option<RelPath> {
        if self.is_root() {
            return None;
        }

        Some(match self.0.rfind('/') {
            Some(index) => RelPath(self.0[..index].to_owned()),
            None => RelPath::root(),
        })
    }

    /// The last component; empty for the root.
    pub fn name(&self) -> &str { self.0.rsplit('/').next().unwrap_or_default() }

    /// Appends a single component.
    pub fn join(&self, name: &str) -> RelPath {
        debug_assert!(
            !name.is_empty() && !name.contains('/'),
            "'{name}' is not a single path component"
        );

        if self.is_root() {
            RelPath(name.to_owned())
        } else {
            RelPath(format!("{}/{name}", self.0))
        }
    }

    /// Appends a relative path.
    pub fn join_path(&self, other: &RelPath) -> RelPath {
        match (self.is_root(), other.is_root()) {
            (_, true) => self.clone(),
            (true, false) => other.clone(),
            (false, false) => RelPath(format!("{}/{}", self.0, other.0)),
        }
    }

    /// Whether `other` is this path or lies below it.
    pub fn contains(&self, other: &RelPath) -> bool { self.relative(other).is_some() }

    /// The part of `other` below this path; the root if they are equal.
    pub fn relative(&self, other: &RelPath) -> Option<RelPath> {
        if self.is_root() {
            return Some(other.clone());
        }

        let rest = other.0.strip_prefix(&self.0)?;
        if rest.is_empty() {
            Some(RelPath::root())
        } else {
            rest.strip_prefix('/').map(|rest| RelPath(rest.to_owned()))
        }
    }

    /// Moves `self` from below `from` to below `to`.
    pub fn rebase(&self, from: &RelPath, to: &RelPath) -> Option<RelPath> {
        from.relative(self).map(|relative| to.join_path(&relative))
    }
}

impl Ord for RelPath {
    fn cmp(&self, other: &Self) -> Ordering { self.components().cmp(other.components()) }
}

impl PartialOrd for RelPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() { f.write_str("(root)") } else { f.write_str(&self.0) }
    }
}

impl fmt::Debug for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:?}", self.0) }
}

impl FromStr for RelPath {
    type Err = WcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { RelPath::new(s) }
}

impl TryFrom<String> for RelPath {
    type Error = WcError;

    fn try_from(value: String) -> Result<Self, Self::Error> { RelPath::new(&value) }
}

impl From<RelPath> for String {
    fn from(value: RelPath) -> Self { value.0 }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    fn path(text: &str) -> RelPath { RelPath::new(text).unwrap() }

    #[test_case("/a"; "leading slash")]
    #[test_case("a/"; "trailing slash")]
    #[test_case("a//b"; "empty component")]
    #[test_case("a/../b"; "parent component")]
    #[test_case("."; "current directory")]
    fn test_rejects_invalid_paths(text: &str) {
        assert!(matches!(RelPath::new(text), Err(WcError::InvalidPath(_))));
    }

    #[test]
    fn test_parent_and_name() {
        assert_eq!(path("a/b/c").parent(), Some(path("a/b")));
        assert_eq!(path("a").parent(), Some(RelPath::root()));
        assert_eq!(RelPath::root().parent(), None);
        assert_eq!(path("a/b/c").name(), "c");
        assert_eq!(RelPath::root().name(), "");
    }

    #[test]
    fn test_descendants_follow_their_ancestor() {
        let mut paths = vec![path("a.txt"), path("a/b/c"), path("b"), path("a"), path("a/b")];
        paths.sort();

        assert_eq!(
            paths,
            [path("a"), path("a/b"), path("a/b/c"), path("a.txt"), path("b")]
        );
    }

    #[test]
    fn test_containment() {
        assert!(RelPath::root().contains(&path("a")));
        assert!(path("a").contains(&path("a")));
        assert!(path("a").contains(&path("a/b")));
        assert!(!path("a").contains(&path("ab")));
        assert!(!path("a/b").contains(&path("a")));

        assert_eq!(path("a").relative(&path("a/b/c")), Some(path("b/c")));
        assert_eq!(path("a/b").rebase(&path("a"), &path("x/y")), Some(path("x/y/b")));
        assert_eq!(path("a").rebase(&path("a"), &path("x")), Some(path("x")));
    }
}
