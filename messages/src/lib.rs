//! Network message types for rota node-to-node communication.

use rota_chain::Block;
use rota_types::{BlockId, Height};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How many recent `(height, block id)` claims a peer's headers retain.
/// Older claims fall out as new blocks are announced.
pub const RECENT_BLOCK_IDS: usize = 10;

/// A peer's network address. Its `Display` form `"ip:port"` is the key
/// peers are tracked under.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerAddress {
    pub ip: String,
    pub port: u16,
}

impl PeerAddress {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Error parsing an `"ip:port"` peer address string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParsePeerAddressError {
    #[error("missing ':' separator in peer address")]
    MissingSeparator,
    #[error("invalid port: {0}")]
    BadPort(String),
}

impl FromStr for PeerAddress {
    type Err = ParsePeerAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ip, port) = s
            .rsplit_once(':')
            .ok_or(ParsePeerAddressError::MissingSeparator)?;
        let port = port
            .parse::<u16>()
            .map_err(|_| ParsePeerAddressError::BadPort(port.to_string()))?;
        Ok(Self::new(ip, port))
    }
}

/// Chain-state headers a node gossips about itself: its tip (broadhash =
/// last block id), its height, and the ids of its most recent blocks.
///
/// The `block_ids` claims feed the height-consensus vote; they are capped at
/// [`RECENT_BLOCK_IDS`] entries, oldest evicted first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerHeaders {
    pub broadhash: BlockId,
    pub height: Height,
    pub block_ids: BTreeMap<Height, BlockId>,
}

impl PeerHeaders {
    pub fn new(broadhash: BlockId, height: Height) -> Self {
        Self {
            broadhash,
            height,
            block_ids: BTreeMap::new(),
        }
    }

    /// Record a block claim, advancing the tip when it is the new highest,
    /// and evict the oldest claims beyond the retention cap.
    pub fn record_block(&mut self, height: Height, id: BlockId) {
        self.block_ids.insert(height, id);
        if height >= self.height {
            self.height = height;
            self.broadhash = id;
        }
        while self.block_ids.len() > RECENT_BLOCK_IDS {
            let oldest = match self.block_ids.keys().next() {
                Some(&h) => h,
                None => break,
            };
            self.block_ids.remove(&oldest);
        }
    }

    /// Heights this node claims to have blocks at.
    pub fn claimed_heights(&self) -> impl Iterator<Item = Height> + '_ {
        self.block_ids.keys().copied()
    }
}

/// Common-ancestor probe: the requester's chain tip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockData {
    pub id: BlockId,
    pub height: Height,
}

/// Block range request: blocks strictly above `height`, at most `limit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLimit {
    pub height: Height,
    pub limit: u32,
}

/// Reply to a common-ancestor probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonBlocksReply {
    pub is_exist: bool,
}

/// A request sent to a single peer, expecting a [`PeerReply`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerRequest {
    CommonBlocks(BlockData),
    Blocks(BlockLimit),
}

/// Reply to a [`PeerRequest`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PeerReply {
    CommonBlocks(CommonBlocksReply),
    Blocks(Vec<Block>),
}

/// Fire-and-forget gossip pushed to peers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PeerGossip {
    HeadersUpdate(PeerHeaders),
    LastBlock(Block),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_address_display_is_map_key_form() {
        let addr = PeerAddress::new("10.0.1.7", 4202);
        assert_eq!(addr.to_string(), "10.0.1.7:4202");
    }

    #[test]
    fn peer_address_parse_roundtrip() {
        let addr: PeerAddress = "192.168.0.5:9000".parse().unwrap();
        assert_eq!(addr, PeerAddress::new("192.168.0.5", 9000));
        assert_eq!(addr.to_string().parse::<PeerAddress>().unwrap(), addr);
    }

    #[test]
    fn peer_address_parse_rejects_garbage() {
        assert_eq!(
            "nocolon".parse::<PeerAddress>(),
            Err(ParsePeerAddressError::MissingSeparator)
        );
        assert!(matches!(
            "host:notaport".parse::<PeerAddress>(),
            Err(ParsePeerAddressError::BadPort(_))
        ));
    }

    #[test]
    fn record_block_advances_tip() {
        let mut headers = PeerHeaders::default();
        headers.record_block(5, BlockId::new([5u8; 32]));
        headers.record_block(6, BlockId::new([6u8; 32]));
        assert_eq!(headers.height, 6);
        assert_eq!(headers.broadhash, BlockId::new([6u8; 32]));
    }

    #[test]
    fn record_block_keeps_tip_on_stale_claim() {
        let mut headers = PeerHeaders::default();
        headers.record_block(6, BlockId::new([6u8; 32]));
        headers.record_block(5, BlockId::new([5u8; 32]));
        assert_eq!(headers.height, 6);
        assert_eq!(headers.broadhash, BlockId::new([6u8; 32]));
        assert_eq!(headers.claimed_heights().collect::<Vec<_>>(), vec![5, 6]);
    }

    #[test]
    fn record_block_evicts_oldest_beyond_cap() {
        let mut headers = PeerHeaders::default();
        for h in 1..=(RECENT_BLOCK_IDS as u64 + 3) {
            headers.record_block(h, BlockId::new([h as u8; 32]));
        }
        assert_eq!(headers.block_ids.len(), RECENT_BLOCK_IDS);
        assert_eq!(headers.claimed_heights().next(), Some(4));
        assert_eq!(headers.height, RECENT_BLOCK_IDS as u64 + 3);
    }

    #[test]
    fn request_bincode_roundtrip() {
        let req = PeerRequest::CommonBlocks(BlockData {
            id: BlockId::new([1u8; 32]),
            height: 42,
        });
        let bytes = bincode::serialize(&req).unwrap();
        let decoded: PeerRequest = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, req);
    }
}
