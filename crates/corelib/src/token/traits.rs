//! Ring position trait.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A position on a ring that wraps from [`Token::max`] back to [`Token::zero`].
///
/// Ranges are closed intervals of tokens, so arithmetic here wraps instead
/// of saturating.
pub trait Token: Copy + Ord + Hash + Send + Sync + Debug + Display + 'static {
    fn zero() -> Self;
    fn max() -> Self;
    fn is_max(&self) -> bool;
    /// Clockwise distance from `self` to `other`.
    fn distance_to(&self, other: &Self) -> Self;
    /// The next position clockwise.
    fn successor(&self) -> Self;
}
