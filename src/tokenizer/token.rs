use std::{cmp::Ordering, fmt::Debug};

/// A unit of comparison. Tokens compare by their normalised value while the
/// original text is kept for rendering.
#[derive(Clone)]
pub struct Token<T> {
    normalised: T,
    original: String,
}

impl<T> Token<T> {
    pub fn new(normalised: T, original: String) -> Self {
        Token {
            normalised,
            original,
        }
    }

    pub fn normalised(&self) -> &T { &self.normalised }

    pub fn original(&self) -> &str { &self.original }

    pub fn set_normalised(&mut self, normalised: T) { self.normalised = normalised; }

    /// Length of the original text in bytes.
    pub fn len(&self) -> usize { self.original.len() }

    pub fn is_empty(&self) -> bool { self.original.is_empty() }
}

impl<T: PartialEq> PartialEq for Token<T> {
    fn eq(&self, other: &Self) -> bool { self.normalised == other.normalised }
}

impl<T: Eq> Eq for Token<T> {}

impl<T: Ord> PartialOrd for Token<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl<T: Ord> Ord for Token<T> {
    fn cmp(&self, other: &Self) -> Ordering { self.normalised.cmp(&other.normalised) }
}

impl<T> Debug for Token<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.original)
    }
}

impl From<&str> for Token<String> {
    fn from(text: &str) -> Self { Token::new(text.to_owned(), text.to_owned()) }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_compares_normalised_value() {
        let a = Token::new("x".to_owned(), "X".to_owned());
        let b = Token::new("x".to_owned(), "x".to_owned());
        let c: Token<String> = "y".into();

        assert_eq!(a, b);
        assert_eq!(a.cmp(&c), Ordering::Less);
        assert_eq!(format!("{a:?}"), r#""X""#);
        assert_eq!(format!("{c:?}"), r#""y""#);
    }
}
