//! Peer tracking and height consensus for the rota node.
//!
//! This crate owns the node's view of the network: the per-peer transport
//! links ([`peer`]), the repository every connected peer and every ban is
//! tracked in ([`repository`]), and the height-agreement computation the
//! sync controller uses to decide whether the local chain matches the
//! network ([`consensus`]).

pub mod consensus;
pub mod error;
pub mod peer;
pub mod repository;

pub use consensus::{block_height_consensus, consensus_pct, quorum_height_span, HeightSpan};
pub use error::NetworkError;
pub use peer::{NetworkPeer, PeerCommand, PeerLink};
pub use repository::PeerNetworkRepository;
