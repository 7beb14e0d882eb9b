//! Layered left-to-right layout over a [`MessageTree`].
//!
//! Depth maps to a column, pre-order visit index within a depth maps
//! to a row. The mapping is pure: same tree and config in, same
//! placements out. A node the user dragged keeps its manual position
//! verbatim, but it still consumes its slot in the column so automatic
//! neighbors do not collapse into the vacated space.

use agora_records::{MessageId, Position};
use serde::Serialize;

use crate::tree::{MessageTree, TreeNode};

/// Spacing parameters of the grid.
///
/// Coordinates are centered on the card: the grid cell minus half the
/// node extent, so the seed's card center sits at the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Card width.
    pub node_width: f64,
    /// Card height.
    pub node_height: f64,
    /// Horizontal gap between depth columns.
    pub rank_sep: f64,
    /// Vertical gap between rows of one column.
    pub sibling_sep: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 220.0,
            node_height: 120.0,
            rank_sep: 100.0,
            sibling_sep: 50.0,
        }
    }
}

impl LayoutConfig {
    #[must_use]
    pub fn with_node_extent(mut self, width: f64, height: f64) -> Self {
        self.node_width = width;
        self.node_height = height;
        self
    }

    #[must_use]
    pub fn with_rank_sep(mut self, sep: f64) -> Self {
        self.rank_sep = sep;
        self
    }

    #[must_use]
    pub fn with_sibling_sep(mut self, sep: f64) -> Self {
        self.sibling_sep = sep;
        self
    }

    fn cell(&self, depth: usize, row: usize) -> Position {
        Position {
            x: depth as f64 * (self.node_width + self.rank_sep) - self.node_width / 2.0,
            y: row as f64 * (self.node_height + self.sibling_sep) - self.node_height / 2.0,
        }
    }
}

/// Final coordinates for one message card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub id: MessageId,
    pub position: Position,
    /// True when the position came from a manual drag rather than the
    /// grid.
    pub pinned: bool,
}

/// Lay out the whole tree.
pub fn layout(tree: &MessageTree, config: &LayoutConfig) -> Vec<Placement> {
    let mut placements = Vec::with_capacity(tree.len());
    if let Some(root) = tree.root() {
        place(root, 0, &mut Vec::new(), config, &mut placements);
    }
    placements
}

/// Lay out only the subtree under `focus`, as if it were the root.
///
/// Used by the isolation view: the focused message lands at the
/// origin column and everything outside its subtree is omitted.
pub fn layout_focused(
    tree: &MessageTree,
    focus: MessageId,
    config: &LayoutConfig,
) -> Vec<Placement> {
    let mut placements = Vec::new();
    if let Some(node) = tree.node(focus) {
        place(node, 0, &mut Vec::new(), config, &mut placements);
    }
    placements
}

fn place(
    node: &TreeNode,
    depth: usize,
    rows: &mut Vec<usize>,
    config: &LayoutConfig,
    out: &mut Vec<Placement>,
) {
    if rows.len() <= depth {
        rows.push(0);
    }
    let row = rows[depth];
    rows[depth] += 1;

    let (position, pinned) = match node.message.manual_position() {
        Some(manual) => (manual, true),
        None => (config.cell(depth, row), false),
    };
    out.push(Placement {
        id: node.message.id,
        position,
        pinned,
    });

    for child in &node.children {
        place(child, depth + 1, rows, config, out);
    }
}
