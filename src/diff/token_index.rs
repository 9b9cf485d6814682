use std::cmp::Ordering;

/// Handle of an interned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

#[derive(Debug)]
struct IndexNode<T> {
    token: T,
    left: Option<usize>,
    right: Option<usize>,
}

/// Binary search tree interning the tokens of one diff invocation, so the
/// LCS search can compare node ids instead of token contents.
#[derive(Debug)]
pub(crate) struct TokenIndex<T> {
    nodes: Vec<IndexNode<T>>,
    root: Option<usize>,
}

impl<T> TokenIndex<T> {
    pub fn new() -> Self {
        TokenIndex {
            nodes: Vec::new(),
            root: None,
        }
    }

    pub fn len(&self) -> usize { self.nodes.len() }

    /// Finds or creates the node for `token`. When an equal token is already
    /// interned, the new one is handed back so its owner can release it.
    pub fn insert<F>(&mut self, token: T, compare: F) -> (NodeId, Option<T>)
    where
        F: Fn(&T, &T) -> Ordering,
    {
        let mut parent = None;
        let mut current = self.root;

        while let Some(index) = current {
            let node = &self.nodes[index];
            match compare(&node.token, &token) {
                Ordering::Equal => return (NodeId(index), Some(token)),
                Ordering::Greater => {
                    parent = Some((index, Ordering::Greater));
                    current = node.left;
                }
                Ordering::Less => {
                    parent = Some((index, Ordering::Less));
                    current = node.right;
                }
            }
        }

        let index = self.nodes.len();
        self.nodes.push(IndexNode {
            token,
            left: None,
            right: None,
        });

        match parent {
            None => self.root = Some(index),
            Some((parent, Ordering::Greater)) => self.nodes[parent].left = Some(index),
            Some((parent, _)) => self.nodes[parent].right = Some(index),
        }

        (NodeId(index), None)
    }

    #[cfg(test)]
    pub fn token(&self, id: NodeId) -> &T { &self.nodes[id.0].token }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_interns_equal_tokens_once() {
        let mut index = TokenIndex::new();
        let compare = |a: &&str, b: &&str| a.cmp(b);

        let (b, duplicate) = index.insert("b", compare);
        assert_eq!(duplicate, None);
        let (a, _) = index.insert("a", compare);
        let (c, _) = index.insert("c", compare);
        let (b_again, duplicate) = index.insert("b", compare);

        assert_eq!(b_again, b);
        assert_eq!(duplicate, Some("b"));
        assert_ne!(a, c);
        assert_eq!(index.len(), 3);
        assert_eq!(*index.token(c), "c");
    }

    #[test]
    fn test_comparator_decides_equality() {
        let mut index = TokenIndex::new();
        let case_insensitive = |a: &String, b: &String| a.to_lowercase().cmp(&b.to_lowercase());

        let (first, _) = index.insert("Line".to_owned(), case_insensitive);
        let (second, duplicate) = index.insert("LINE".to_owned(), case_insensitive);

        assert_eq!(first, second);
        assert_eq!(duplicate.as_deref(), Some("LINE"));
    }
}
