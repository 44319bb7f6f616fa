//! Frame codec.
//!
//! A frame is a JSON document, passed through a [`Cipher`], followed by a
//! single carriage return.

use crate::error::{Result, StreamingError};
use crate::protocol::Frame;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};

/// Frame terminator.
pub const DELIMITER: u8 = b'\r';

/// Largest accepted frame body, delimiter excluded.
pub const MAX_FRAME_LEN: usize = 128 * 1024;

/// Symmetric transform applied to every frame body.
///
/// Sealed output must never contain [`DELIMITER`].
pub trait Cipher: Send + Sync + 'static {
    fn seal(&self, plain: Vec<u8>) -> Result<Vec<u8>>;
    fn open(&self, sealed: Vec<u8>) -> Result<Vec<u8>>;
}

/// Identity cipher used until a shared secret is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct Plaintext;

impl Cipher for Plaintext {
    fn seal(&self, plain: Vec<u8>) -> Result<Vec<u8>> {
        Ok(plain)
    }

    fn open(&self, sealed: Vec<u8>) -> Result<Vec<u8>> {
        Ok(sealed)
    }
}

#[derive(Clone)]
pub struct FrameCodec {
    cipher: Arc<dyn Cipher>,
}

impl fmt::Debug for FrameCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameCodec").finish_non_exhaustive()
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::plaintext()
    }
}

impl FrameCodec {
    pub fn new(cipher: Arc<dyn Cipher>) -> Self {
        Self { cipher }
    }

    pub fn plaintext() -> Self {
        Self::new(Arc::new(Plaintext))
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = StreamingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        let Some(end) = src.iter().position(|b| *b == DELIMITER) else {
            if src.len() > MAX_FRAME_LEN {
                return Err(StreamingError::FrameTooLarge {
                    len: src.len(),
                    max: MAX_FRAME_LEN,
                });
            }
            return Ok(None);
        };
        if end > MAX_FRAME_LEN {
            return Err(StreamingError::FrameTooLarge {
                len: end,
                max: MAX_FRAME_LEN,
            });
        }

        let mut frame = src.split_to(end + 1);
        frame.truncate(end);
        let plain = self.cipher.open(frame.to_vec())?;
        Ok(Some(serde_json::from_slice(&plain)?))
    }

    /// A partial frame left at end of stream means the peer hung up mid-write.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(StreamingError::ConnectionClosed),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = StreamingError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        let body = self.cipher.seal(serde_json::to_vec(&frame)?)?;
        if body.len() > MAX_FRAME_LEN {
            return Err(StreamingError::FrameTooLarge {
                len: body.len(),
                max: MAX_FRAME_LEN,
            });
        }
        if body.contains(&DELIMITER) {
            return Err(StreamingError::Cipher("sealed frame contains the delimiter".into()));
        }
        dst.reserve(body.len() + 1);
        dst.put_slice(&body);
        dst.put_u8(DELIMITER);
        Ok(())
    }
}
