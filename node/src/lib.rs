//! The rota node: everything between the wire and the chain.
//!
//! Wires the repositories, round engine, task scheduler, and peer network
//! into one dispatch loop. [`RotaNode`] is the assembled node; the daemon
//! builds one from a [`NodeConfig`] and runs it.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod forging;
pub mod loader;
pub mod mempool;
pub mod node;
pub mod sync;
pub mod system;

pub use config::NodeConfig;
pub use dispatch::{Action, TaskKey};
pub use error::NodeError;
pub use node::{Inbound, NodeHandle, NodeState, RotaNode};
pub use sync::SyncService;
