use std::{fmt, str::FromStr};

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// MD5 digest of a text, rendered as 32 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Md5Digest([u8; 16]);

impl Md5Digest {
    pub fn of(bytes: &[u8]) -> Self {
        let mut context = Md5Context::default();
        context.update(bytes);
        context.finish()
    }

    pub fn as_bytes(&self) -> &[u8; 16] { &self.0 }
}

impl fmt::Display for Md5Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&hex::encode(self.0)) }
}

impl fmt::Debug for Md5Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Md5Digest({self})") }
}

impl FromStr for Md5Digest {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; 16];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Md5Digest(bytes))
    }
}

impl TryFrom<String> for Md5Digest {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl From<Md5Digest> for String {
    fn from(value: Md5Digest) -> Self { value.to_string() }
}

/// Incrementally computed [`Md5Digest`].
#[derive(Debug, Clone, Default)]
pub(crate) struct Md5Context(Md5);

impl Md5Context {
    pub fn update(&mut self, bytes: &[u8]) { self.0.update(bytes); }

    pub fn finish(self) -> Md5Digest {
        let mut bytes = [0; 16];
        bytes.copy_from_slice(&self.0.finalize());
        Md5Digest(bytes)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_digest_of_empty_text() {
        assert_eq!(
            Md5Digest::of(b"").to_string(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_incremental_digest_matches_one_shot() {
        let mut context = Md5Context::default();
        context.update(b"hello ");
        context.update(b"world");

        assert_eq!(context.finish(), Md5Digest::of(b"hello world"));
    }

    #[test]
    fn test_parse_round_trip_and_rejects_garbage() {
        let digest = Md5Digest::of(b"abc");
        assert_eq!(digest.to_string().parse::<Md5Digest>().unwrap(), digest);
        assert!("not hex".parse::<Md5Digest>().is_err());
        assert!("abcd".parse::<Md5Digest>().is_err());
    }
}
