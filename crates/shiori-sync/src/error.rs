//! Error types for sync operations.
//!
//! Every failure is a returned value, never control flow by panic. The
//! engine's contract is "failure implies no net change": by the time a
//! caller sees any of these, both trees are exactly as they were.

use thiserror::Error;

use shiori_types::{BlockId, BlockKind, NodeId};

/// Errors that can occur during block/AST sync operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Block not found in the active tree.
    #[error("block not found: {0:?}")]
    BlockNotFound(BlockId),

    /// AST node not found in the active label.
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// A block's stored link did not resolve against the AST.
    #[error("link on block {block:?} did not resolve: {detail}")]
    StaleLink { block: BlockId, detail: String },

    /// Named field absent on the block.
    #[error("block {0:?} has no field named {1:?}")]
    FieldNotFound(BlockId, String),

    /// Label not present in the script.
    #[error("label not found: {0:?}")]
    LabelNotFound(String),

    /// Operation attempted against an incompatible parent kind.
    #[error("cannot place {child} under {parent}")]
    Structural { child: BlockKind, parent: BlockKind },

    /// The label root itself cannot be deleted or moved.
    #[error("the label root is not removable")]
    RootNotRemovable,

    /// Paste invoked with an empty clipboard.
    #[error("clipboard is empty")]
    EmptyClipboard,
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_stable() {
        let err = SyncError::Structural {
            child: BlockKind::Choice,
            parent: BlockKind::Dialogue,
        };
        assert_eq!(err.to_string(), "cannot place choice under dialogue");

        assert_eq!(
            SyncError::EmptyClipboard.to_string(),
            "clipboard is empty"
        );
    }
}
