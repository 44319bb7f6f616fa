//! MD5 partitioner.

use crate::partitioner::traits::Partitioner;
use crate::token::md5::Md5Token;

/// Places keys and node addresses with the same MD5 hash.
#[derive(Clone, Copy, Debug, Default)]
pub struct Md5Partitioner;

impl Partitioner for Md5Partitioner {
    type TokenType = Md5Token;

    fn partition(&self, bytes: &[u8]) -> Md5Token {
        Md5Token::from_bytes(bytes)
    }
}
