//! TCP front end of a node.
//!
//! One task accepts connections and one task serves each of them. All of
//! them stop when SHUTDOWN arrives or the shutdown handle fires.

use crate::error::NodeError;
use crate::handler::dispatch;
use crate::state::NodeState;
use corelib::node::NodeAddress;
use std::sync::Arc;
use streaming::{Connection, FrameCodec};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

pub struct NodeServer {
    listener: TcpListener,
    state: Arc<NodeState>,
    codec: FrameCodec,
}

/// Stops a running [`NodeServer`] from outside.
#[derive(Clone)]
pub struct ShutdownHandle {
    state: Arc<NodeState>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.state.clear_links();
        self.state.request_shutdown();
    }
}

impl NodeServer {
    /// Binds the listening socket for `address`.
    pub async fn bind(address: NodeAddress) -> Result<Self, NodeError> {
        let listener = TcpListener::bind((address.host.as_str(), address.port))
            .await
            .map_err(|source| NodeError::Bind {
                address: address.clone(),
                source,
            })?;
        Ok(Self::from_listener(listener, address))
    }

    /// Serves on an already bound listener, announced as `address`.
    pub fn from_listener(listener: TcpListener, address: NodeAddress) -> Self {
        Self {
            listener,
            state: Arc::new(NodeState::new(address)),
            codec: FrameCodec::plaintext(),
        }
    }

    pub fn with_codec(mut self, codec: FrameCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn state(&self) -> Arc<NodeState> {
        Arc::clone(&self.state)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Accepts connections until shutdown.
    pub async fn run(self) -> Result<(), NodeError> {
        let mut shutdown = self.state.subscribe_shutdown();
        info!(node = %self.state.address(), "listening");

        while !*shutdown.borrow() {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(node = %self.state.address(), %peer, "connection accepted");
                        let conn = Connection::from_stream(stream, self.codec.clone());
                        tokio::spawn(serve_connection(Arc::clone(&self.state), conn));
                    }
                    Err(e) => error!(node = %self.state.address(), error = %e, "accept failed"),
                },
                _ = shutdown.changed() => {}
            }
        }

        info!(node = %self.state.address(), "stopped");
        Ok(())
    }
}

async fn serve_connection(state: Arc<NodeState>, mut conn: Connection) {
    let mut shutdown = state.subscribe_shutdown();
    let peer = conn.peer();

    while !*shutdown.borrow() {
        let received = tokio::select! {
            received = conn.recv() => received,
            _ = shutdown.changed() => break,
        };
        let frame = match received {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                warn!(node = %state.address(), ?peer, error = %e, "dropping connection");
                break;
            }
        };
        let Some(reply) = dispatch(state.as_ref(), frame).await else {
            break;
        };
        if let Err(e) = conn.send(reply).await {
            warn!(node = %state.address(), ?peer, error = %e, "reply failed");
            break;
        }
    }

    let _ = conn.close().await;
    debug!(node = %state.address(), ?peer, "connection closed");
}
