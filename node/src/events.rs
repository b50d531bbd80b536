//! Deferred actions.
//!
//! While a sync cycle runs, the chain tip is in flux and forge/gossip
//! actions would act on state about to be rewritten. The dispatch loop
//! parks them here and replays them, in arrival order, once sync exits.

use crate::dispatch::Action;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct EventQueue {
    deferred: VecDeque<Action>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.deferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deferred.is_empty()
    }

    pub fn defer(&mut self, action: Action) {
        self.deferred.push_back(action);
    }

    pub fn drain(&mut self) -> Vec<Action> {
        self.deferred.drain(..).collect()
    }
}
