//! Bidirectional block/AST synchronization for Shiori scripts.
//!
//! The editor shows a script label as a tree of visual blocks; the exporter
//! and runtime consume a statement AST. Both live in memory at once, and
//! every edit goes through [`SyncEngine`] so the two stay structurally
//! isomorphic: same entities, same order, same nesting.
//!
//! # Operations
//!
//! - [`SyncEngine::add`] / [`SyncEngine::delete`] — insert or remove a block
//!   and its AST mirror
//! - [`SyncEngine::move_block`] — reparent/reorder within a label
//! - [`SyncEngine::move_across_labels`] — top-level move between labels
//! - [`SyncEngine::copy`] / [`SyncEngine::paste`] — clipboard duplication
//!   with fresh ids throughout
//! - [`SyncEngine::update_field`] — propagate a block field edit into the
//!   matching AST properties
//!
//! # Failure semantics
//!
//! Every operation either completes on both trees or leaves both exactly as
//! they were. The block tree mutates first; if the AST step then fails, the
//! block step is undone with its exact inverse before the error propagates.

mod engine;
mod error;
mod factory;
mod properties;
mod resolve;

pub use engine::{Clipboard, SyncEngine};
pub use error::{Result, SyncError};
pub use factory::{create_block, create_node, default_fields};
pub use resolve::{
    BlockSite, find_block, find_block_mut, find_block_with_parent, find_node, find_node_mut,
    locate_block,
};

// =============================================================================
// Tests
// =============================================================================
