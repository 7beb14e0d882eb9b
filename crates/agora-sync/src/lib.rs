//! Agora Sync - Message Synchronization Layer
//!
//! Keeps each client's view of a session consistent with the record
//! store under concurrent mutation.
//!
//! # Architecture
//!
//! - [`MessageFeed`]: the synchronized message list. Loads once,
//!   then follows the change feed; sends are echoed back by the
//!   subscription rather than appended optimistically.
//! - [`SessionDesk`]: moderator lifecycle operations, including the
//!   producer side of the activation signal and cascade deletion.
//! - [`Synthesizer`]: the seam to the AI facilitator, gated by an
//!   [`EngagementPolicy`].
//!
//! # Design
//!
//! Writes are checked defensively: a store fronted by access control
//! rejects unauthorized writes by affecting zero rows, and this layer
//! turns that count into [`Error::NotPermitted`] so callers never
//! mistake a policy denial for a transport failure. Reads degrade to
//! stale-but-functional instead.

mod desk;
mod error;
mod feed;
mod synthesizer;

pub use desk::{generate_join_code, SessionDesk};
pub use error::{Error, Result};
pub use feed::{DeleteOutcome, FeedHandle, MessageFeed};
pub use synthesizer::{run_synthesis, EngagementPolicy, Synthesis, Synthesizer, AI_COLOR};
