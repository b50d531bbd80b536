//! Keyed delayed tasks for the rota node.
//!
//! The round engine and the sync controller both work with single-shot
//! delayed actions identified by a logical key ("forge", "finish the
//! round", "start sync"): scheduling under a key that is already pending
//! replaces the old entry, and a pending entry can be cancelled by key.
//! [`TaskQueue`] is the pure ordered structure; [`Scheduler`] drives it on
//! the tokio clock and delivers due tasks into an mpsc channel the node's
//! dispatch loop reads from.

mod queue;
mod scheduler;

pub use queue::TaskQueue;
pub use scheduler::{Scheduler, SchedulerHandle};
