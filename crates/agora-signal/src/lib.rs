//! Agora Signal - Activation Signaling and Presence
//!
//! Server-driven notifications layered over the record store's
//! redundant delivery paths.
//!
//! # Architecture
//!
//! - [`watch_activation`] / [`SignalHandle`]: three producer channels
//!   (gate bulletin, session change feed, authoritative poll) racing
//!   toward one idempotent activation flip. The flip assumes no
//!   ordering between channels.
//! - [`PresenceRoster`]: join/leave tracking over the bulletin
//!   primitive, with age-based expiry.

mod presence;
mod watcher;

pub use presence::{presence_channel, PresenceConfig, PresenceRoster};
pub use watcher::{watch_activation, SignalConfig, SignalHandle};
