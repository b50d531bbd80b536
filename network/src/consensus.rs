//! Height agreement across peers.
//!
//! Each unbanned peer votes for every height it claims a block at (its
//! gossiped recent block ids). The band of heights with the most voters is
//! the network's height signal; the sync controller compares the local tip
//! against it. The vote is a plurality, not a majority — the quorum gate
//! below is what keeps a sliver of the network from steering sync.

use crate::peer::NetworkPeer;
use rota_types::Height;
use std::collections::BTreeMap;

/// The span of heights sharing the maximum voter count.
///
/// Distinct heights can tie; the span keeps the whole band and lets the
/// caller pick a policy (sync aims for `max`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeightSpan {
    pub max: Height,
    pub min: Height,
}

/// Plurality vote over the heights unbanned peers claim blocks at.
/// `None` when no peer claims anything.
pub fn block_height_consensus(peers: &[&NetworkPeer]) -> Option<HeightSpan> {
    let mut voters: BTreeMap<Height, usize> = BTreeMap::new();
    for peer in peers.iter().filter(|p| !p.banned) {
        for height in peer.headers.claimed_heights() {
            *voters.entry(height).or_default() += 1;
        }
    }
    let best = voters.values().copied().max()?;
    let mut agreed = voters
        .iter()
        .filter(|(_, &count)| count == best)
        .map(|(&height, _)| height);
    let min = agreed.next()?;
    let max = agreed.last().unwrap_or(min);
    Some(HeightSpan { max, min })
}

/// The height span, but only when its voter count covers at least
/// `quorum_pct` percent of the unbanned peers considered. Below quorum the
/// signal is not authoritative and the caller should treat the network
/// height as unknown.
pub fn quorum_height_span(peers: &[&NetworkPeer], quorum_pct: u8) -> Option<HeightSpan> {
    let unbanned: Vec<&NetworkPeer> = peers.iter().copied().filter(|p| !p.banned).collect();
    if unbanned.is_empty() {
        return None;
    }
    let span = block_height_consensus(&unbanned)?;
    let mut best = 0usize;
    {
        let mut voters: BTreeMap<Height, usize> = BTreeMap::new();
        for peer in &unbanned {
            for height in peer.headers.claimed_heights() {
                *voters.entry(height).or_default() += 1;
            }
        }
        if let Some(&count) = voters.get(&span.max) {
            best = count;
        }
    }
    if best * 100 >= unbanned.len() * quorum_pct as usize {
        Some(span)
    } else {
        None
    }
}

/// Percentage of unbanned peers whose reported tip height equals
/// `our_height`. A node with no unbanned peers is trivially consistent.
pub fn consensus_pct(peers: &[&NetworkPeer], our_height: Height) -> u8 {
    let unbanned: Vec<&&NetworkPeer> = peers.iter().filter(|p| !p.banned).collect();
    if unbanned.is_empty() {
        return 100;
    }
    let agreeing = unbanned
        .iter()
        .filter(|p| p.headers.height == our_height)
        .count();
    (agreeing * 100 / unbanned.len()) as u8
}
