//! MD5 token implementation.
//!
//! A token is the MD5 digest of some bytes read as a big-endian unsigned
//! 128-bit integer. On the wire it is written as 32 lowercase hex digits.

use crate::error::Error;
use crate::token::traits::Token;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// MD5 token using u128 representation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Md5Token(pub u128);

impl Md5Token {
    pub const MIN: Md5Token = Md5Token(0);
    pub const MAX: Md5Token = Md5Token(u128::MAX);
}

impl Token for Md5Token {
    fn zero() -> Self {
        Self::MIN
    }

    fn max() -> Self {
        Self::MAX
    }

    fn is_max(&self) -> bool {
        self.0 == u128::MAX
    }

    fn distance_to(&self, other: &Self) -> Self {
        Md5Token(other.0.wrapping_sub(self.0))
    }

    fn successor(&self) -> Self {
        Md5Token(self.0.wrapping_add(1))
    }
}

impl Md5Token {
    /// Creates a token by hashing a byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        let digest = ::md5::compute(data);
        Md5Token(u128::from_be_bytes(digest.0))
    }

    /// Creates a token from a string key.
    pub fn from_key(key: &str) -> Self {
        Self::from_bytes(key.as_bytes())
    }
}

impl fmt::Display for Md5Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl FromStr for Md5Token {
    type Err = Error;

    /// Parses hex, padded or not. Anything longer than 32 digits is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 32 {
            return Err(Error::InvalidToken(format!("bad hex length: {:?}", s)));
        }
        u128::from_str_radix(s, 16)
            .map(Md5Token)
            .map_err(|e| Error::InvalidToken(format!("{:?}: {}", s, e)))
    }
}

impl Serialize for Md5Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Md5Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        let token = Md5Token::from_key("");
        assert_eq!(token.to_string(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_hex_parse_accepts_unpadded() {
        let token: Md5Token = "ff".parse().unwrap();
        assert_eq!(token, Md5Token(255));
        assert_eq!(token.to_string().len(), 32);
    }

    #[test]
    fn test_hex_parse_rejects_garbage() {
        assert!("".parse::<Md5Token>().is_err());
        assert!("xyz".parse::<Md5Token>().is_err());
        assert!("1".repeat(33).parse::<Md5Token>().is_err());
    }

    #[test]
    fn test_bounds_match_token_trait() {
        assert_eq!(Md5Token::MAX, <Md5Token as Token>::max());
        assert_eq!(Md5Token::MIN, <Md5Token as Token>::zero());
        assert!(Md5Token::MAX.is_max());
    }

    #[test]
    fn test_successor_wraps() {
        assert_eq!(Md5Token::MAX.successor(), Md5Token::zero());
        assert_eq!(Md5Token(7).successor(), Md5Token(8));
    }

    #[test]
    fn test_distance_wraps() {
        assert_eq!(Md5Token(10).distance_to(&Md5Token(15)), Md5Token(5));
        assert_eq!(Md5Token::MAX.distance_to(&Md5Token(0)), Md5Token(1));
    }
}
