//! A tracked peer and its transport link.

use crate::NetworkError;
use rota_messages::{PeerAddress, PeerGossip, PeerHeaders, PeerReply, PeerRequest};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// How long a request may wait for the peer's reply.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Buffer for a peer's outbound command channel.
const COMMAND_BUFFER: usize = 64;

/// Outbound commands carried over a [`PeerLink`].
///
/// The transport task behind the link performs the I/O: it serializes
/// requests onto the wire and routes the peer's answer back through the
/// carried `reply` sender.
#[derive(Debug)]
pub enum PeerCommand {
    Request {
        request: PeerRequest,
        reply: oneshot::Sender<PeerReply>,
    },
    Gossip(PeerGossip),
    Disconnect,
}

/// The sending half of a peer's transport seam.
///
/// Cloneable; all clones feed the same transport task. When the task (and
/// with it the receiving half) goes away, every operation reports
/// [`NetworkError::ChannelClosed`].
#[derive(Clone, Debug)]
pub struct PeerLink {
    tx: mpsc::Sender<PeerCommand>,
}

impl PeerLink {
    /// Create a link and the command receiver its transport task reads.
    pub fn channel() -> (Self, mpsc::Receiver<PeerCommand>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        (Self { tx }, rx)
    }

    /// Send `request` and await the reply, bounded by [`REQUEST_TIMEOUT`].
    pub async fn request(
        &self,
        peer: &PeerAddress,
        request: PeerRequest,
    ) -> Result<PeerReply, NetworkError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PeerCommand::Request {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| NetworkError::ChannelClosed)?;

        match tokio::time::timeout(REQUEST_TIMEOUT, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(NetworkError::ChannelClosed),
            Err(_) => Err(NetworkError::RequestTimeout { peer: peer.clone() }),
        }
    }

    /// Fire-and-forget gossip. A full or closed channel drops the message;
    /// gossip is repeated, never awaited.
    pub fn gossip(&self, gossip: PeerGossip) {
        if self.tx.try_send(PeerCommand::Gossip(gossip)).is_err() {
            debug!("gossip dropped, peer channel full or closed");
        }
    }

    /// Tell the transport task to close the connection.
    pub fn disconnect(&self) {
        let _ = self.tx.try_send(PeerCommand::Disconnect);
    }
}

/// A peer as the node tracks it: address, last reported chain headers,
/// ban flag, and the live transport link.
#[derive(Clone, Debug)]
pub struct NetworkPeer {
    pub address: PeerAddress,
    pub headers: PeerHeaders,
    pub banned: bool,
    pub link: PeerLink,
}

impl NetworkPeer {
    pub fn new(address: PeerAddress, link: PeerLink) -> Self {
        Self {
            address,
            headers: PeerHeaders::default(),
            banned: false,
            link,
        }
    }

    /// The `"ip:port"` key this peer is tracked under.
    pub fn key(&self) -> String {
        self.address.to_string()
    }
}
