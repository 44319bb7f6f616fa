//! Framed request/response connection over TCP.

use crate::codec::FrameCodec;
use crate::error::{Result, StreamingError};
use crate::protocol::{AdminMessage, Frame, KvMessage};
use corelib::node::NodeAddress;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::trace;

/// A TCP stream speaking whole frames.
#[derive(Debug)]
pub struct Connection {
    framed: Framed<TcpStream, FrameCodec>,
    peer: Option<SocketAddr>,
}

impl Connection {
    /// Opens a plaintext connection to `address`.
    pub async fn connect(address: &NodeAddress) -> Result<Self> {
        Self::connect_with(address, FrameCodec::plaintext()).await
    }

    pub async fn connect_with(address: &NodeAddress, codec: FrameCodec) -> Result<Self> {
        let stream = TcpStream::connect((address.host.as_str(), address.port)).await?;
        Ok(Self::from_stream(stream, codec))
    }

    /// Wraps an accepted stream.
    pub fn from_stream(stream: TcpStream, codec: FrameCodec) -> Self {
        // Frames are small request/response pairs.
        let _ = stream.set_nodelay(true);
        let peer = stream.peer_addr().ok();
        Self {
            framed: Framed::new(stream, codec),
            peer,
        }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub async fn send(&mut self, frame: Frame) -> Result<()> {
        self.framed.send(frame).await?;
        trace!(peer = ?self.peer, "frame sent");
        Ok(())
    }

    /// Reads the next frame. `None` means the peer closed between frames.
    pub async fn recv(&mut self) -> Result<Option<Frame>> {
        self.framed.next().await.transpose()
    }

    /// Sends `frame` and waits for the reply.
    pub async fn request(&mut self, frame: Frame) -> Result<Frame> {
        self.send(frame).await?;
        self.recv().await?.ok_or(StreamingError::ConnectionClosed)
    }

    pub async fn request_kv(&mut self, message: KvMessage) -> Result<KvMessage> {
        match self.request(Frame::Kv(message)).await? {
            Frame::Kv(reply) => Ok(reply),
            Frame::Admin(_) => Err(StreamingError::UnexpectedFrame { expected: "kv" }),
        }
    }

    pub async fn request_admin(&mut self, message: AdminMessage) -> Result<AdminMessage> {
        match self.request(Frame::Admin(message)).await? {
            Frame::Admin(reply) => Ok(reply),
            Frame::Kv(_) => Err(StreamingError::UnexpectedFrame { expected: "admin" }),
        }
    }

    /// Flushes and half-closes the write side.
    pub async fn close(&mut self) -> Result<()> {
        self.framed.close().await
    }
}
