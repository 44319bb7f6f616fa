//! Key and node placement.

pub mod md5;
pub mod traits;

pub use self::md5::Md5Partitioner;
pub use traits::Partitioner;
