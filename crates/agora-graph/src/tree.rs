//! Tree construction from flat parent-referenced message rows.
//!
//! Messages arrive as an unordered flat list; each row names its
//! parent by id. The builder resolves those references into one tree
//! rooted at the seed (the row with a null parent). Reference
//! resolution is total: a row whose parent id does not resolve is
//! reattached under the seed instead of being dropped, so every input
//! row appears in the tree exactly once.

use std::collections::{BTreeMap, HashSet};

use agora_records::{Message, MessageId};
use tracing::debug;

/// One resolved node: the message plus its ordered children.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub message: Message,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of nodes in this subtree, including self.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }
}

/// The resolved message tree of one session.
#[derive(Debug, Clone, Default)]
pub struct MessageTree {
    root: Option<TreeNode>,
}

impl MessageTree {
    /// Build the tree from a flat list.
    ///
    /// The seed is the oldest row with a null parent. Siblings are
    /// ordered by creation time (id breaks ties), so the same input
    /// set always yields the same tree regardless of input order.
    ///
    /// Fallback rules, applied in order:
    /// - a row pointing at an absent parent hangs off the seed
    /// - a parentless row that is not the seed hangs off the seed
    /// - with no parentless row at all, the oldest row acts as seed
    pub fn build(messages: &[Message]) -> Self {
        if messages.is_empty() {
            return Self::default();
        }

        let mut sorted: Vec<Message> = messages.to_vec();
        sorted.sort_by_key(|m| (m.created_at, m.id.0));

        let ids: HashSet<MessageId> = sorted.iter().map(|m| m.id).collect();
        let seed_id = sorted
            .iter()
            .find(|m| m.is_seed())
            .or(sorted.first())
            .map(|m| m.id)
            .unwrap_or(MessageId(0));

        // Child lists keyed by resolved parent, in creation order.
        let mut children: BTreeMap<u64, Vec<Message>> = BTreeMap::new();
        let mut seed = None;
        let mut orphans = 0usize;
        for message in sorted {
            if message.id == seed_id {
                seed = Some(message);
                continue;
            }
            let parent = match message.parent_id {
                Some(p) if ids.contains(&p) => p,
                _ => {
                    orphans += 1;
                    seed_id
                }
            };
            children.entry(parent.0).or_default().push(message);
        }
        if orphans > 0 {
            debug!(orphans, "reattached unresolvable rows under the seed");
        }

        let root = seed.map(|message| attach(message, &mut children));
        Self { root }
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Total node count.
    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::size)
    }

    /// Find the node carrying `id`, if present.
    pub fn node(&self, id: MessageId) -> Option<&TreeNode> {
        fn find(node: &TreeNode, id: MessageId) -> Option<&TreeNode> {
            if node.message.id == id {
                return Some(node);
            }
            node.children.iter().find_map(|c| find(c, id))
        }
        self.root.as_ref().and_then(|r| find(r, id))
    }

    /// Whether `id` has any children after reference resolution.
    ///
    /// Resolution matters here: a row may look childless by raw
    /// `parent_id` inspection yet carry reattached orphans.
    pub fn has_children(&self, id: MessageId) -> bool {
        self.node(id).is_some_and(|n| !n.children.is_empty())
    }
}

fn attach(message: Message, children: &mut BTreeMap<u64, Vec<Message>>) -> TreeNode {
    let own = children.remove(&message.id.0).unwrap_or_default();
    TreeNode {
        message,
        children: own.into_iter().map(|m| attach(m, children)).collect(),
    }
}
