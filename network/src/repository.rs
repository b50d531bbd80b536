//! The peer network repository.
//!
//! Owns every tracked peer, keyed by `"ip:port"`. The ban list is a
//! separate set from the live-peer map: a peer can be banned while
//! disconnected, and its record (if any) carries the flag too so either
//! state can be checked without the other.

use crate::peer::NetworkPeer;
use rand::seq::IteratorRandom;
use rota_messages::{PeerAddress, PeerHeaders, RECENT_BLOCK_IDS};
use rota_types::Height;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

#[derive(Default)]
pub struct PeerNetworkRepository {
    peers: HashMap<String, NetworkPeer>,
    ban_list: HashSet<String>,
}

impl PeerNetworkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a connected peer. An address on the ban list comes in already
    /// flagged banned; reconnecting does not launder a ban.
    pub fn add(&mut self, mut peer: NetworkPeer) {
        let key = peer.key();
        peer.banned = self.ban_list.contains(&key);
        self.peers.insert(key, peer);
    }

    /// Drop a peer, disconnecting its transport first so no live
    /// connection outlives its record.
    pub fn remove(&mut self, address: &PeerAddress) {
        if let Some(peer) = self.peers.remove(&address.to_string()) {
            peer.link.disconnect();
        }
    }

    pub fn remove_all(&mut self) {
        for peer in self.peers.values() {
            peer.link.disconnect();
        }
        self.peers.clear();
    }

    pub fn get(&self, address: &PeerAddress) -> Option<&NetworkPeer> {
        self.peers.get(&address.to_string())
    }

    pub fn get_many_by_address(&self, addresses: &[PeerAddress]) -> Vec<&NetworkPeer> {
        addresses.iter().filter_map(|a| self.get(a)).collect()
    }

    pub fn get_all(&self) -> Vec<&NetworkPeer> {
        self.peers.values().collect()
    }

    pub fn has(&self, address: &PeerAddress) -> bool {
        self.peers.contains_key(&address.to_string())
    }

    pub fn count(&self) -> usize {
        self.peers.len()
    }

    /// Tracked peers not on the ban list.
    pub fn unban_count(&self) -> usize {
        self.peers.values().filter(|p| !p.banned).count()
    }

    /// Ban an address: it joins the ban set, and a currently tracked peer
    /// record is flagged as well.
    pub fn ban(&mut self, address: &PeerAddress) {
        let key = address.to_string();
        warn!(peer = %key, "banning peer");
        self.ban_list.insert(key.clone());
        if let Some(peer) = self.peers.get_mut(&key) {
            peer.banned = true;
        }
    }

    pub fn unban(&mut self, address: &PeerAddress) {
        let key = address.to_string();
        self.ban_list.remove(&key);
        if let Some(peer) = self.peers.get_mut(&key) {
            peer.banned = false;
        }
    }

    pub fn is_banned(&self, address: &PeerAddress) -> bool {
        let key = address.to_string();
        self.ban_list.contains(&key)
            || self.peers.get(&key).map(|p| p.banned).unwrap_or(false)
    }

    pub fn clear_ban_list(&mut self) {
        info!(banned = self.ban_list.len(), "clearing ban list");
        self.ban_list.clear();
        for peer in self.peers.values_mut() {
            peer.banned = false;
        }
    }

    /// Gossip write path: replace a peer's reported headers, keeping only
    /// the most recent [`RECENT_BLOCK_IDS`] block claims.
    pub fn update_headers(&mut self, address: &PeerAddress, mut headers: PeerHeaders) {
        while headers.block_ids.len() > RECENT_BLOCK_IDS {
            let Some(&oldest) = headers.block_ids.keys().next() else {
                break;
            };
            headers.block_ids.remove(&oldest);
        }
        if let Some(peer) = self.peers.get_mut(&address.to_string()) {
            peer.headers = headers;
        }
    }

    /// A random unbanned peer claiming a chain strictly above `our_height`
    /// — a candidate to sync from.
    pub fn random_ahead(&self, our_height: Height) -> Option<&NetworkPeer> {
        self.peers
            .values()
            .filter(|p| !p.banned && p.headers.height > our_height)
            .choose(&mut rand::thread_rng())
    }

    /// Unbanned peers, for consensus computations.
    pub fn unbanned(&self) -> Vec<&NetworkPeer> {
        self.peers.values().filter(|p| !p.banned).collect()
    }
}
