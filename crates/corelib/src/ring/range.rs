//! Inclusive hash ranges on the circular token space.

use crate::token::{Md5Token, Token};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive range `[start, end]` of tokens, read clockwise.
///
/// When `start > end` the range wraps through `max -> zero`. A range whose
/// `start` is `end + 1` covers the whole ring.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct HashRange {
    pub start: Md5Token,
    pub end: Md5Token,
}

impl HashRange {
    pub fn new(start: Md5Token, end: Md5Token) -> Self {
        Self { start, end }
    }

    /// The range covering every token.
    pub fn full() -> Self {
        Self::new(Md5Token::zero(), Md5Token::MAX)
    }

    /// True if the range passes through the `max -> zero` boundary.
    pub fn is_wrapping(&self) -> bool {
        self.start > self.end
    }

    /// Returns true if `token` lies in this range.
    pub fn contains(&self, token: Md5Token) -> bool {
        if self.is_wrapping() {
            token >= self.start || token <= self.end
        } else {
            self.start <= token && token <= self.end
        }
    }

    /// Number of tokens covered, minus one.
    ///
    /// Summing `span() + 1` over a tiling wraps to exactly zero.
    pub fn span(&self) -> u128 {
        self.start.distance_to(&self.end).0
    }
}

impl fmt::Display for HashRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
