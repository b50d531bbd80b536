//! The rota round engine.
//!
//! A round assigns every active delegate one forging slot, in an order every
//! node derives identically from chain state alone: hash each delegate key
//! with the id of the block preceding the round, sort the digests, hand out
//! consecutive slots. This crate owns that computation, the slot clock that
//! maps wall time onto the slot grid, the round lifecycle (generate, settle
//! fees, roll back, restore after sync), and the in-memory current/previous
//! round state.

pub mod ordering;
pub mod repository;
pub mod round;
pub mod service;
pub mod slots;

pub use ordering::{assign_slots, generate_hash_list, sort_hash_list, ForgeOrderEntry};
pub use repository::RoundRepository;
pub use round::Round;
pub use service::{RoundError, RoundScheduler, RoundService, RoundSum};
pub use slots::{wall_now_ms, SlotClock};
