//! Agora Graph - Tree and Layout Engine
//!
//! Pure transformations from a session's flat message rows to a
//! renderable tree. No async, no I/O; the sync layer feeds rows in
//! and renders placements out.
//!
//! # Architecture
//!
//! - [`MessageTree`]: resolves flat parent references into one tree
//!   rooted at the seed, reattaching unresolvable rows instead of
//!   dropping them.
//! - [`layout`] / [`layout_focused`]: deterministic layered
//!   left-to-right placement, with manual drag positions taking
//!   precedence over the grid.
//! - [`reconcile`]: merges a fresh fetch into a locally evolved list,
//!   replacing on membership change and patching content otherwise.

mod layout;
mod reconcile;
mod tree;

pub use layout::{layout, layout_focused, LayoutConfig, Placement};
pub use reconcile::{reconcile, Reconciliation};
pub use tree::{MessageTree, TreeNode};
