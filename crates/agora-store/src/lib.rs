//! Agora Store - Record Store Contract
//!
//! The persistence seam of the board. Everything above this crate
//! programs against the [`RecordStore`] trait; everything below it is
//! a backend detail.
//!
//! # Architecture
//!
//! - [`RecordStore`]: async CRUD over sessions, messages and reactions,
//!   plus per-filter change feeds and a bulletin pub/sub primitive.
//! - [`RowEvent`] / [`Bulletin`]: the two event shapes a store emits.
//! - [`MemoryStore`]: the in-memory reference backend used by the test
//!   suites, with knobs that simulate denial and transport failure.
//!
//! # Design
//!
//! Updates and deletes return affected-row counts instead of failing
//! loudly. A backend fronted by access control rejects unauthorized
//! writes by reporting zero rows, and callers are expected to treat
//! that count as the authorization verdict.

mod error;
mod event;
mod memory;
mod store;

pub use error::{Error, Result};
pub use event::{gate_channel, Bulletin, RowEvent};
pub use memory::MemoryStore;
pub use store::RecordStore;
