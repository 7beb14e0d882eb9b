//! Agora Reactions - Reaction Aggregation
//!
//! Per-message reaction tallies with a per-participant optimistic
//! toggle. The board flips its local state first, writes second, and
//! lets a re-fetch settle on ground truth; an in-flight guard keeps
//! two rapid taps from racing each other.
//!
//! Errors re-use the store taxonomy directly: a rejected reaction
//! delete is a stale reference here, not a denial, so this crate adds
//! no error variants of its own.

mod board;

pub use board::{BoardHandle, ReactionBoard, ToggleOutcome};
