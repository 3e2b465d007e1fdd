//! Typed identifiers for blocks and AST nodes, plus the link address type.
//!
//! Both ID types wrap a process-unique `u64` handed out by an [`IdAllocator`].
//! Ids are assigned at creation and never reused. The allocator is explicit —
//! threaded through the engine rather than a module-level counter — so tests
//! can construct a deterministic sequence.
//!
//! [`NodeLink`] is the address a block stores for its paired AST entity.
//! Choices and if/elif/else branches are array elements inside an owning node
//! with no standalone id of their own, so they get a tagged synthetic address
//! (`Choice` / `Branch`) instead of a `NodeId`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A block identifier.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(u64);

/// An AST node identifier.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $prefix:literal) => {
        impl $T {
            /// Wrap a raw value. Intended for deserialization and tests;
            /// live ids come from [`IdAllocator`].
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw value.
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($T), "({})"), self.0)
            }
        }
    };
}

impl_typed_id!(BlockId, "b");
impl_typed_id!(NodeId, "n");

/// Monotonic id source for blocks and AST nodes.
///
/// One allocator serves both id spaces from a single counter, so a `BlockId`
/// and a `NodeId` never share a raw value within one editing session. That
/// keeps mixed-id debug output unambiguous.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Start allocating from 1. Zero is left free as an informal sentinel.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Start allocating from a known floor — used when trees built elsewhere
    /// (e.g. by the parser-side tree builder) already contain ids.
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// Allocate a fresh block id.
    pub fn fresh_block(&mut self) -> BlockId {
        BlockId(self.bump())
    }

    /// Allocate a fresh node id.
    pub fn fresh_node(&mut self) -> NodeId {
        NodeId(self.bump())
    }

    fn bump(&mut self) -> u64 {
        let v = self.next;
        self.next += 1;
        v
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Address of the AST entity paired with a block.
///
/// Freestanding statements link by `NodeId`. Menu choices and if/elif/else
/// branches live inside their owner's array and are addressed by owner plus a
/// discriminator: the choice's current text, or the branch's index.
///
/// Invariant: whenever an operation changes a discriminating field — renaming
/// a choice, removing a branch so later branches shift down — it must rewrite
/// the affected links so future lookups still resolve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeLink {
    /// No paired AST entity (comment blocks, the label root).
    #[default]
    None,
    /// A freestanding AST node.
    Node { id: NodeId },
    /// A choice inside a menu node, addressed by its current text.
    Choice { owner: NodeId, text: String },
    /// A branch inside an if node, addressed by its index.
    Branch { owner: NodeId, index: usize },
}

impl NodeLink {
    /// The node id, if this is a direct node link.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            NodeLink::Node { id } => Some(*id),
            _ => None,
        }
    }

    /// The owning node id, if this is a synthetic (choice/branch) link.
    pub fn owner(&self) -> Option<NodeId> {
        match self {
            NodeLink::Choice { owner, .. } | NodeLink::Branch { owner, .. } => Some(*owner),
            _ => None,
        }
    }

    /// Whether this links to anything at all.
    pub fn is_linked(&self) -> bool {
        !matches!(self, NodeLink::None)
    }

    /// Parse the legacy string encoding: `{owner}_choice_{text}` or
    /// `{owner}_branch_{index}`, where owner is a bare decimal node id.
    ///
    /// The choice arm splits on the *first* `_choice_` so text containing the
    /// delimiter survives; a non-numeric branch index is a parse failure
    /// rather than a silent misread.
    pub fn parse_synthetic(s: &str) -> Option<NodeLink> {
        if let Some(pos) = s.find("_choice_") {
            let owner: u64 = s[..pos].parse().ok()?;
            let text = s[pos + "_choice_".len()..].to_string();
            return Some(NodeLink::Choice {
                owner: NodeId(owner),
                text,
            });
        }
        if let Some(pos) = s.find("_branch_") {
            let owner: u64 = s[..pos].parse().ok()?;
            let index: usize = s[pos + "_branch_".len()..].parse().ok()?;
            return Some(NodeLink::Branch {
                owner: NodeId(owner),
                index,
            });
        }
        None
    }
}

impl fmt::Display for NodeLink {
    /// Renders the legacy string encoding; `None` renders empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeLink::None => Ok(()),
            NodeLink::Node { id } => write!(f, "{}", id.raw()),
            NodeLink::Choice { owner, text } => write!(f, "{}_choice_{}", owner.raw(), text),
            NodeLink::Branch { owner, index } => write!(f, "{}_branch_{}", owner.raw(), index),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_monotonic() {
        let mut ids = IdAllocator::new();
        let a = ids.fresh_block();
        let b = ids.fresh_block();
        let n = ids.fresh_node();
        assert!(a.raw() < b.raw());
        assert!(b.raw() < n.raw());
    }

    #[test]
    fn test_allocator_spaces_never_collide() {
        let mut ids = IdAllocator::new();
        let b = ids.fresh_block();
        let n = ids.fresh_node();
        assert_ne!(b.raw(), n.raw());
    }

    #[test]
    fn test_allocator_starting_at() {
        let mut ids = IdAllocator::starting_at(100);
        assert_eq!(ids.fresh_block().raw(), 100);
        assert_eq!(ids.fresh_node().raw(), 101);
    }

    #[test]
    fn test_block_id_usable_as_map_key() {
        use std::collections::HashMap;
        let id = BlockId::from_raw(7);
        let mut map = HashMap::new();
        map.insert(id, "hello");
        assert_eq!(map.get(&id), Some(&"hello"));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(BlockId::from_raw(3).to_string(), "b3");
        assert_eq!(NodeId::from_raw(9).to_string(), "n9");
    }

    #[test]
    fn test_id_serde_json_roundtrip() {
        let id = NodeId::from_raw(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42"); // transparent
        let parsed: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_id_postcard_roundtrip() {
        let id = BlockId::from_raw(42);
        let bytes = postcard::to_stdvec(&id).unwrap();
        let parsed: BlockId = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(id, parsed);
    }

    // ── NodeLink ────────────────────────────────────────────────────────

    #[test]
    fn test_link_accessors() {
        let node = NodeLink::Node {
            id: NodeId::from_raw(5),
        };
        assert_eq!(node.node_id(), Some(NodeId::from_raw(5)));
        assert_eq!(node.owner(), None);
        assert!(node.is_linked());

        let choice = NodeLink::Choice {
            owner: NodeId::from_raw(2),
            text: "Yes".into(),
        };
        assert_eq!(choice.owner(), Some(NodeId::from_raw(2)));
        assert_eq!(choice.node_id(), None);

        assert!(!NodeLink::None.is_linked());
    }

    #[test]
    fn test_link_display_matches_legacy_encoding() {
        let choice = NodeLink::Choice {
            owner: NodeId::from_raw(12),
            text: "Go left".into(),
        };
        assert_eq!(choice.to_string(), "12_choice_Go left");

        let branch = NodeLink::Branch {
            owner: NodeId::from_raw(4),
            index: 2,
        };
        assert_eq!(branch.to_string(), "4_branch_2");
    }

    #[test]
    fn test_parse_synthetic_roundtrip() {
        let choice = NodeLink::Choice {
            owner: NodeId::from_raw(12),
            text: "Go left".into(),
        };
        assert_eq!(NodeLink::parse_synthetic(&choice.to_string()), Some(choice));

        let branch = NodeLink::Branch {
            owner: NodeId::from_raw(4),
            index: 2,
        };
        assert_eq!(NodeLink::parse_synthetic(&branch.to_string()), Some(branch));
    }

    #[test]
    fn test_parse_synthetic_survives_delimiter_in_text() {
        // Choice text that itself contains "_branch_" must not misparse.
        let link = NodeLink::parse_synthetic("7_choice_use the _branch_ exit").unwrap();
        assert_eq!(
            link,
            NodeLink::Choice {
                owner: NodeId::from_raw(7),
                text: "use the _branch_ exit".into(),
            }
        );
    }

    #[test]
    fn test_parse_synthetic_rejects_bad_input() {
        assert_eq!(NodeLink::parse_synthetic(""), None);
        assert_eq!(NodeLink::parse_synthetic("12"), None);
        assert_eq!(NodeLink::parse_synthetic("x_choice_hi"), None);
        assert_eq!(NodeLink::parse_synthetic("4_branch_two"), None);
    }

    #[test]
    fn test_link_serde_roundtrip() {
        let link = NodeLink::Branch {
            owner: NodeId::from_raw(9),
            index: 1,
        };
        let json = serde_json::to_string(&link).unwrap();
        let parsed: NodeLink = serde_json::from_str(&json).unwrap();
        assert_eq!(link, parsed);
    }
}
