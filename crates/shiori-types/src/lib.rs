//! Shared model types for Shiori.
//!
//! This crate is the structural foundation: typed ids, the visual block tree,
//! and the script AST it mirrors. It has **no internal shiori dependencies** —
//! a pure leaf crate that the sync engine builds on.
//!
//! # Two trees, one meaning
//!
//! ```text
//! Block tree (what the editor renders)     Script AST (source of truth)
//!
//! Label "start"                            label start:
//! ├── Dialogue ── link ──────────────────▶     e "Hello!"
//! ├── Menu ────── link ──────────────────▶     menu:
//! │   ├── Choice ─ link: Choice{owner,…} ▶         "Go left":
//! │   │   └── Dialogue ── link ──────────▶             "You went left."
//! │   └── Choice ─ link: Choice{owner,…} ▶         "Go right":
//! └── Comment    (no link — editor only)
//! ```
//!
//! Every non-comment block addresses exactly one AST entity through its
//! [`NodeLink`]. Choices and if/elif/else branches have no standalone node id
//! in the AST — they are array elements on their owner — so their links are
//! synthetic (`Choice` / `Branch`). Keeping the two trees isomorphic under
//! edits is the sync engine's job (`shiori-sync`).

pub mod ast;
pub mod block;
pub mod ids;

// Re-export primary types at crate root for convenience.
pub use ast::{AstNode, Branch, LabelNode, MenuChoice, NodeKind, Script};
pub use block::{Block, BlockKind, Category, Field, FieldValue};
pub use ids::{BlockId, IdAllocator, NodeId, NodeLink};

/// Current time as Unix milliseconds. Used by clipboard records.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
