use rota_messages::PeerAddress;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    /// The peer's command channel is gone; the connection is dead.
    #[error("peer channel closed")]
    ChannelClosed,

    /// The peer did not answer a request within the allowed window.
    #[error("request to {peer} timed out")]
    RequestTimeout { peer: PeerAddress },

    /// The peer answered with a reply of the wrong kind.
    #[error("unexpected reply from {peer}")]
    UnexpectedReply { peer: PeerAddress },

    /// The peer claimed blocks it then failed to deliver.
    #[error("peer {peer} sent no usable blocks")]
    EmptyBlockBatch { peer: PeerAddress },

    /// No unbanned peer is far enough ahead (with enough agreement behind
    /// it) to sync from.
    #[error("no worthy peers to sync with")]
    NoWorthyPeers,
}
