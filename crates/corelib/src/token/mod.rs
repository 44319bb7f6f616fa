//! Ring positions.
//!
//! Node addresses and client keys share one position space: the MD5 digest
//! of their bytes.

pub mod md5;
pub mod traits;

pub use self::md5::Md5Token;
pub use traits::Token;
