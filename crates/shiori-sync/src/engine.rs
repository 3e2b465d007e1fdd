//! Structural operation engine: the add/delete/move/copy/paste primitives.
//!
//! Every operation mutates the caller-owned block tree and script in place
//! and returns a `Result`; on failure both trees are exactly as they were.
//! The rollback discipline is fixed: the block-tree mutation happens first,
//! the AST mutation second, and if the AST step fails the block-tree step is
//! undone with its exact inverse before the error is returned. A caller can
//! always assume "failure implies no net change".
//!
//! Index arguments are clamped into `[0, len]` rather than rejected: too
//! large means "end". (Indices are `usize`, so "negative means start" is
//! unrepresentable at this boundary — the caller's coordinate math clamps
//! below zero before it gets here.)

use tracing::debug;

use shiori_types::{
    AstNode, Block, BlockId, BlockKind, Branch, FieldValue, IdAllocator, LabelNode, MenuChoice,
    NodeId, NodeKind, NodeLink, Script, now_millis,
};

use crate::error::{Result, SyncError};
use crate::factory;
use crate::properties;
use crate::resolve::{
    branches_mut, choice_mut, choices_mut, find_block, find_block_mut, locate_block, remove_node,
};

/// An immutable copied subtree, tagged with where and when it was taken.
/// The clone shares no structure with the live tree.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Clipboard {
    pub blocks: Vec<Block>,
    pub source_label: String,
    pub copied_at: u64,
}

/// The block/AST synchronization engine.
///
/// Owns the id allocator; everything else — the block tree per open label and
/// the script — belongs to the caller and is passed into each operation.
/// Single-threaded and synchronous: every entry point runs to completion with
/// no suspension points.
#[derive(Debug)]
pub struct SyncEngine {
    ids: IdAllocator,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self {
            ids: IdAllocator::new(),
        }
    }

    /// Construct with a caller-provided allocator — lets tests inject a
    /// deterministic id sequence.
    pub fn with_ids(ids: IdAllocator) -> Self {
        Self { ids }
    }

    /// Build a fresh label-root block for an open scope. The root pairs with
    /// the label container itself, so it carries no link.
    pub fn label_root(&mut self, name: &str) -> Block {
        let mut root = factory::create_block(&mut self.ids, BlockKind::Label);
        if let Some(field) = root.field_mut("name") {
            field.value = FieldValue::Text(name.to_string());
        }
        root
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Insert a fresh block of `kind` under `parent_id` at `index`, and
    /// mirror it into the AST. Returns the new block's id.
    pub fn add(
        &mut self,
        root: &mut Block,
        script: &mut Script,
        label_name: &str,
        kind: BlockKind,
        parent_id: BlockId,
        index: usize,
    ) -> Result<BlockId> {
        debug!(%kind, %parent_id, index, "add block");
        let parent = find_block(root, parent_id).ok_or(SyncError::BlockNotFound(parent_id))?;
        check_placement(kind, parent.kind)?;
        let template = factory::create_block(&mut self.ids, kind);
        self.insert_subtree(root, script, label_name, &template, parent_id, index)
    }

    /// Delete a block and all its descendants from both trees. The label
    /// root itself is not removable. AST absence is tolerated — once the
    /// block is located, deletion is unconditional.
    pub fn delete(
        &mut self,
        root: &mut Block,
        script: &mut Script,
        label_name: &str,
        id: BlockId,
    ) -> Result<()> {
        debug!(%id, "delete block");
        let site = locate_block(root, id).ok_or(SyncError::BlockNotFound(id))?;
        let Some(parent_id) = site.parent else {
            return Err(SyncError::RootNotRemovable);
        };
        let label = script
            .label_mut(label_name)
            .ok_or_else(|| SyncError::LabelNotFound(label_name.to_string()))?;

        let parent = find_block_mut(root, parent_id).ok_or(SyncError::BlockNotFound(parent_id))?;
        let removed = parent.children.remove(site.index);

        match &removed.link {
            NodeLink::None => {}
            NodeLink::Choice { owner, text } => {
                if let Some(choices) = choices_mut(label, *owner) {
                    if let Some(pos) = choices.iter().position(|c| c.text == *text) {
                        choices.remove(pos);
                    }
                }
            }
            NodeLink::Branch { owner, index } => {
                let removed_branch = branches_mut(label, *owner)
                    .filter(|branches| *index < branches.len())
                    .map(|branches| branches.remove(*index))
                    .is_some();
                // Later branches shifted down; rewrite sibling links so they
                // keep resolving. Only when something actually came out — a
                // dangling index must not disturb the siblings.
                if removed_branch {
                    if let Some(parent) = find_block_mut(root, parent_id) {
                        renumber_branch_links(parent, *owner, *index);
                    }
                }
            }
            NodeLink::Node { .. } => {
                let mut node_ids = Vec::new();
                collect_node_ids(&removed, &mut node_ids);
                for nid in node_ids {
                    // Nested ids live inside the first removed node; their
                    // individual removals simply find nothing.
                    let _ = remove_node(label, nid);
                }
            }
        }
        Ok(())
    }

    /// Move a block to a new parent and index within the same label.
    /// Choices may only move between menus; elif/else blocks do not move at
    /// all (branches are append-only).
    pub fn move_block(
        &mut self,
        root: &mut Block,
        script: &mut Script,
        label_name: &str,
        id: BlockId,
        new_parent_id: BlockId,
        new_index: usize,
    ) -> Result<()> {
        debug!(%id, %new_parent_id, new_index, "move block");
        let site = locate_block(root, id).ok_or(SyncError::BlockNotFound(id))?;
        let Some(src_parent_id) = site.parent else {
            return Err(SyncError::RootNotRemovable);
        };
        let moving = find_block(root, id).ok_or(SyncError::BlockNotFound(id))?;
        let kind = moving.kind;
        let link = moving.link.clone();
        let dest =
            find_block(root, new_parent_id).ok_or(SyncError::BlockNotFound(new_parent_id))?;
        let dest_kind = dest.kind;
        let dest_link = dest.link.clone();
        check_placement(kind, dest_kind)?;
        if matches!(kind, BlockKind::Elif | BlockKind::Else) {
            return Err(SyncError::Structural {
                child: kind,
                parent: dest_kind,
            });
        }
        // A container cannot move into its own subtree.
        if find_block(moving, new_parent_id).is_some() {
            return Err(SyncError::Structural {
                child: kind,
                parent: dest_kind,
            });
        }
        let label = script
            .label_mut(label_name)
            .ok_or_else(|| SyncError::LabelNotFound(label_name.to_string()))?;

        // Block step.
        let srcp =
            find_block_mut(root, src_parent_id).ok_or(SyncError::BlockNotFound(src_parent_id))?;
        let block = srcp.children.remove(site.index);
        let mut dest_index = new_index;
        if src_parent_id == new_parent_id && site.index < dest_index {
            // Classic same-list reinsertion adjustment.
            dest_index -= 1;
        }
        let destp =
            find_block_mut(root, new_parent_id).ok_or(SyncError::BlockNotFound(new_parent_id))?;
        let ci = dest_index.min(destp.children.len());
        destp.children.insert(ci, block);
        let node_idx = node_index_before(&destp.children, ci);
        let choice_idx = choice_index_before(&destp.children, ci);

        // AST step — only `label` is touched here, so a failure leaves the
        // AST coherent and we can undo the block step with its exact inverse.
        let ast_step: Result<Option<NodeLink>> = (|| match &link {
            NodeLink::None => Ok(None),
            NodeLink::Node { id: nid } => {
                validate_insert_target(label, new_parent_id, dest_kind, &dest_link)?;
                let node = remove_node(label, *nid).ok_or(SyncError::NodeNotFound(*nid))?;
                insert_node(label, new_parent_id, dest_kind, &dest_link, node_idx, node)?;
                Ok(None)
            }
            NodeLink::Choice { owner, text } => {
                let new_owner = dest_link
                    .node_id()
                    .ok_or_else(|| stale(new_parent_id, "menu block has no node link"))?;
                if choices_mut(label, new_owner).is_none() {
                    return Err(stale(new_parent_id, "owner is not a menu node"));
                }
                let record = {
                    let choices = choices_mut(label, *owner)
                        .ok_or_else(|| stale(id, "old owner is not a menu node"))?;
                    let pos = choices
                        .iter()
                        .position(|c| c.text == *text)
                        .ok_or_else(|| stale(id, "choice not found by text"))?;
                    choices.remove(pos)
                };
                let choices = choices_mut(label, new_owner)
                    .ok_or_else(|| stale(new_parent_id, "owner is not a menu node"))?;
                let ai = choice_idx.min(choices.len());
                choices.insert(ai, record);
                Ok(Some(NodeLink::Choice {
                    owner: new_owner,
                    text: text.clone(),
                }))
            }
            // Unreachable past the elif/else guard above.
            NodeLink::Branch { .. } => Err(SyncError::Structural {
                child: kind,
                parent: dest_kind,
            }),
        })();

        match ast_step {
            Ok(new_link) => {
                if let Some(new_link) = new_link {
                    if let Some(destp) = find_block_mut(root, new_parent_id) {
                        destp.children[ci].link = new_link;
                    }
                }
                Ok(())
            }
            Err(e) => {
                debug!(%id, error = %e, "move failed, reverting block step");
                let destp = find_block_mut(root, new_parent_id)
                    .ok_or(SyncError::BlockNotFound(new_parent_id))?;
                let block = destp.children.remove(ci);
                let srcp = find_block_mut(root, src_parent_id)
                    .ok_or(SyncError::BlockNotFound(src_parent_id))?;
                srcp.children.insert(site.index, block);
                Err(e)
            }
        }
    }

    /// Move a block from one label's root container to another's. Synthetic
    /// blocks (choices, branches) cannot leave their owner.
    #[allow(clippy::too_many_arguments)]
    pub fn move_across_labels(
        &mut self,
        source_root: &mut Block,
        target_root: &mut Block,
        script: &mut Script,
        source_label: &str,
        target_label: &str,
        id: BlockId,
        target_index: usize,
    ) -> Result<()> {
        debug!(%id, source_label, target_label, target_index, "move across labels");
        let site = locate_block(source_root, id).ok_or(SyncError::BlockNotFound(id))?;
        let Some(src_parent_id) = site.parent else {
            return Err(SyncError::RootNotRemovable);
        };
        let kind = find_block(source_root, id)
            .ok_or(SyncError::BlockNotFound(id))?
            .kind;
        if kind.is_synthetic() {
            return Err(SyncError::Structural {
                child: kind,
                parent: BlockKind::Label,
            });
        }
        script
            .label(source_label)
            .ok_or_else(|| SyncError::LabelNotFound(source_label.to_string()))?;
        script
            .label(target_label)
            .ok_or_else(|| SyncError::LabelNotFound(target_label.to_string()))?;

        // Block step.
        let srcp = find_block_mut(source_root, src_parent_id)
            .ok_or(SyncError::BlockNotFound(src_parent_id))?;
        let block = srcp.children.remove(site.index);
        let link = block.link.clone();
        let ci = target_index.min(target_root.children.len());
        target_root.children.insert(ci, block);

        // AST step.
        let nid = match link {
            NodeLink::None => return Ok(()), // comments carry no AST entity
            NodeLink::Node { id } => id,
            // Synthetic kinds were rejected above; a synthetic link on any
            // other kind is corrupted state, not a movable node.
            NodeLink::Choice { .. } | NodeLink::Branch { .. } => {
                let block = target_root.children.remove(ci);
                let srcp = find_block_mut(source_root, src_parent_id)
                    .ok_or(SyncError::BlockNotFound(src_parent_id))?;
                srcp.children.insert(site.index, block);
                return Err(stale(id, "unexpected synthetic link"));
            }
        };
        let node_idx = node_index_before(&target_root.children, ci);
        let removed = script
            .label_mut(source_label)
            .and_then(|l| remove_node(l, nid));
        let Some(node) = removed else {
            debug!(%id, "cross-label move failed, reverting block step");
            let block = target_root.children.remove(ci);
            let srcp = find_block_mut(source_root, src_parent_id)
                .ok_or(SyncError::BlockNotFound(src_parent_id))?;
            srcp.children.insert(site.index, block);
            return Err(SyncError::NodeNotFound(nid));
        };
        // Target label was verified above; insertion cannot fail.
        let target = script
            .label_mut(target_label)
            .ok_or_else(|| SyncError::LabelNotFound(target_label.to_string()))?;
        let i = node_idx.min(target.body.len());
        target.body.insert(i, node);
        Ok(())
    }

    /// Deep-clone a block subtree into an immutable clipboard record.
    /// Returns `None` if the block is not found.
    pub fn copy(&self, root: &Block, label_name: &str, id: BlockId) -> Option<Clipboard> {
        let block = find_block(root, id)?;
        Some(Clipboard {
            blocks: vec![block.clone()],
            source_label: label_name.to_string(),
            copied_at: now_millis(),
        })
    }

    /// Paste every clipboard block under `parent_id`, at increasing indices
    /// starting from `index`. Every clone gets fresh block and node ids
    /// throughout its subtree. Fails with no mutation on an empty clipboard;
    /// a mid-sequence failure rolls back the blocks already pasted.
    pub fn paste(
        &mut self,
        root: &mut Block,
        script: &mut Script,
        label_name: &str,
        clipboard: &Clipboard,
        parent_id: BlockId,
        index: usize,
    ) -> Result<Vec<BlockId>> {
        debug!(%parent_id, index, blocks = clipboard.blocks.len(), "paste");
        if clipboard.blocks.is_empty() {
            return Err(SyncError::EmptyClipboard);
        }
        let parent = find_block(root, parent_id).ok_or(SyncError::BlockNotFound(parent_id))?;
        for template in &clipboard.blocks {
            check_placement(template.kind, parent.kind)?;
        }
        let mut new_ids = Vec::with_capacity(clipboard.blocks.len());
        for (offset, template) in clipboard.blocks.iter().enumerate() {
            match self.insert_subtree(root, script, label_name, template, parent_id, index + offset)
            {
                Ok(bid) => new_ids.push(bid),
                Err(e) => {
                    debug!(error = %e, "paste failed, rolling back pasted prefix");
                    for bid in new_ids.iter().rev() {
                        let _ = self.delete(root, script, label_name, *bid);
                    }
                    return Err(e);
                }
            }
        }
        Ok(new_ids)
    }

    /// Set a named field on a block and mirror the change into the AST.
    /// On sync failure the field is restored to its prior value.
    pub fn update_field(
        &mut self,
        root: &mut Block,
        script: &mut Script,
        label_name: &str,
        id: BlockId,
        field: &str,
        value: FieldValue,
    ) -> Result<()> {
        debug!(%id, field, "update field");
        let block = find_block_mut(root, id).ok_or(SyncError::BlockNotFound(id))?;
        let slot = block
            .field_mut(field)
            .ok_or_else(|| SyncError::FieldNotFound(id, field.to_string()))?;
        let prior = std::mem::replace(&mut slot.value, value);
        if !block.kind.has_ast() {
            // Comment blocks (and the root) have nothing to mirror.
            return Ok(());
        }
        let label = script
            .label_mut(label_name)
            .ok_or_else(|| SyncError::LabelNotFound(label_name.to_string()))?;
        match properties::apply(label, block, field, &prior) {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(%id, field, error = %e, "field sync failed, restoring prior value");
                if let Some(slot) = block.field_mut(field) {
                    slot.value = prior;
                }
                Err(e)
            }
        }
    }

    // =========================================================================
    // Subtree insertion (shared by add and paste)
    // =========================================================================

    /// Insert a fresh-id clone of `template` (subtree included) under
    /// `parent_id` at `index`, building and placing its AST mirror.
    fn insert_subtree(
        &mut self,
        root: &mut Block,
        script: &mut Script,
        label_name: &str,
        template: &Block,
        parent_id: BlockId,
        index: usize,
    ) -> Result<BlockId> {
        let parent = find_block(root, parent_id).ok_or(SyncError::BlockNotFound(parent_id))?;
        let parent_kind = parent.kind;
        let parent_link = parent.link.clone();
        let parent_len = parent.children.len();
        let label = script
            .label_mut(label_name)
            .ok_or_else(|| SyncError::LabelNotFound(label_name.to_string()))?;

        let mut block = self.reclone(template);
        let bid = block.id;
        match block.kind {
            BlockKind::Choice => {
                let Some(owner) = parent_link.node_id() else {
                    return Err(stale(parent_id, "menu block has no node link"));
                };
                let record = self.materialize_choice(&mut block, owner);
                let ci = index.min(parent_len);
                let parent = find_block_mut(root, parent_id)
                    .ok_or(SyncError::BlockNotFound(parent_id))?;
                parent.children.insert(ci, block);
                let choice_idx = choice_index_before(&parent.children, ci);
                match choices_mut(label, owner) {
                    Some(choices) => {
                        let ai = choice_idx.min(choices.len());
                        choices.insert(ai, record);
                        Ok(bid)
                    }
                    None => {
                        find_block_mut(root, parent_id)
                            .ok_or(SyncError::BlockNotFound(parent_id))?
                            .children
                            .remove(ci);
                        Err(stale(parent_id, "owner is not a menu node"))
                    }
                }
            }
            BlockKind::Elif | BlockKind::Else => {
                let Some(owner) = parent_link.node_id() else {
                    return Err(stale(parent_id, "if block has no node link"));
                };
                let Some(branches) = branches_mut(label, owner) else {
                    return Err(stale(parent_id, "owner is not an if node"));
                };
                let branch_idx = branches.len();
                let record = self.materialize_branch(&mut block, owner, branch_idx);
                // Branches are append-only; the block always lands after the
                // true-branch content, at the end of the children.
                let parent = find_block_mut(root, parent_id)
                    .ok_or(SyncError::BlockNotFound(parent_id))?;
                parent.children.push(block);
                if let Some(branches) = branches_mut(label, owner) {
                    branches.push(record);
                }
                Ok(bid)
            }
            _ => {
                let node = self.materialize(&mut block);
                let ci = index.min(parent_len);
                let parent = find_block_mut(root, parent_id)
                    .ok_or(SyncError::BlockNotFound(parent_id))?;
                parent.children.insert(ci, block);
                let node_idx = node_index_before(&parent.children, ci);
                if let Some(node) = node {
                    if let Err(e) =
                        insert_node(label, parent_id, parent_kind, &parent_link, node_idx, node)
                    {
                        find_block_mut(root, parent_id)
                            .ok_or(SyncError::BlockNotFound(parent_id))?
                            .children
                            .remove(ci);
                        return Err(e);
                    }
                }
                Ok(bid)
            }
        }
    }

    /// Clone a template subtree with fresh block ids and cleared links.
    fn reclone(&mut self, template: &Block) -> Block {
        Block {
            id: self.ids.fresh_block(),
            kind: template.kind,
            fields: template.fields.clone(),
            link: NodeLink::None,
            children: template
                .children
                .iter()
                .map(|child| self.reclone(child))
                .collect(),
        }
    }

    /// Build the AST mirror for a freestanding block subtree, assigning
    /// fresh node ids and writing links back onto the blocks. `None` for
    /// comments.
    fn materialize(&mut self, block: &mut Block) -> Option<AstNode> {
        let mut node = factory::create_node(&mut self.ids, block)?;
        block.link = NodeLink::Node { id: node.id };
        let owner = node.id;
        match &mut node.kind {
            NodeKind::Menu { choices } => {
                for child in &mut block.children {
                    if child.kind == BlockKind::Choice {
                        let record = self.materialize_choice(child, owner);
                        choices.push(record);
                    }
                }
            }
            NodeKind::If { branches } => {
                for child in &mut block.children {
                    match child.kind {
                        BlockKind::Elif | BlockKind::Else => {
                            let index = branches.len();
                            let record = self.materialize_branch(child, owner, index);
                            branches.push(record);
                        }
                        _ => {
                            if let Some(inner) = self.materialize(child) {
                                branches[0].body.push(inner);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        Some(node)
    }

    /// Build a menu-choice record from a choice block, linking the block and
    /// materializing its body.
    fn materialize_choice(&mut self, block: &mut Block, owner: NodeId) -> MenuChoice {
        let mut record = MenuChoice::new(block.field_text("text").to_string());
        record.condition = factory::non_empty(block.field_text("condition"));
        block.link = NodeLink::Choice {
            owner,
            text: record.text.clone(),
        };
        for child in &mut block.children {
            if let Some(node) = self.materialize(child) {
                record.body.push(node);
            }
        }
        record
    }

    /// Build a branch record from an elif/else block, linking the block and
    /// materializing its body.
    fn materialize_branch(
        &mut self,
        block: &mut Block,
        owner: NodeId,
        index: usize,
    ) -> Branch {
        let condition = match block.kind {
            BlockKind::Else => None,
            _ => Some(factory::condition_or_true(block.field_text("condition"))),
        };
        block.link = NodeLink::Branch { owner, index };
        let mut record = Branch::new(condition);
        for child in &mut block.children {
            if let Some(node) = self.materialize(child) {
                record.body.push(node);
            }
        }
        record
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Placement
// =============================================================================

/// Structural compatibility of a child kind with a parent kind. These are
/// checked before any mutation, so a violation costs nothing to report.
fn check_placement(child: BlockKind, parent: BlockKind) -> Result<()> {
    let bad = child == BlockKind::Label
        || (child == BlockKind::Choice && parent != BlockKind::Menu)
        || (matches!(child, BlockKind::Elif | BlockKind::Else) && parent != BlockKind::If)
        || (parent == BlockKind::Menu && child != BlockKind::Choice);
    if bad {
        Err(SyncError::Structural { child, parent })
    } else {
        Ok(())
    }
}

/// Insert a freestanding node into the structural location implied by the
/// parent block: label body, choice body, branch body, or — for
/// non-container parents — immediately after the parent's own node in the
/// label body (end of body if the parent's node cannot be located).
fn insert_node(
    label: &mut LabelNode,
    parent_id: BlockId,
    parent_kind: BlockKind,
    parent_link: &NodeLink,
    index: usize,
    node: AstNode,
) -> Result<()> {
    match parent_kind {
        BlockKind::Label => {
            let i = index.min(label.body.len());
            label.body.insert(i, node);
            Ok(())
        }
        BlockKind::Choice => {
            let NodeLink::Choice { owner, text } = parent_link else {
                return Err(stale(parent_id, "choice block has no synthetic link"));
            };
            let choice = choice_mut(label, *owner, text)
                .ok_or_else(|| stale(parent_id, "choice not found on owner menu"))?;
            let i = index.min(choice.body.len());
            choice.body.insert(i, node);
            Ok(())
        }
        BlockKind::If => {
            let owner = parent_link
                .node_id()
                .ok_or_else(|| stale(parent_id, "if block has no node link"))?;
            let first = branches_mut(label, owner)
                .and_then(|b| b.first_mut())
                .ok_or_else(|| stale(parent_id, "if node has no branches"))?;
            let i = index.min(first.body.len());
            first.body.insert(i, node);
            Ok(())
        }
        BlockKind::Elif | BlockKind::Else => {
            let NodeLink::Branch { owner, index: bidx } = parent_link else {
                return Err(stale(parent_id, "branch block has no synthetic link"));
            };
            let branch = branches_mut(label, *owner)
                .and_then(|b| b.get_mut(*bidx))
                .ok_or_else(|| stale(parent_id, "branch not found on owner"))?;
            let i = index.min(branch.body.len());
            branch.body.insert(i, node);
            Ok(())
        }
        _ => {
            let pos = parent_link
                .node_id()
                .and_then(|nid| label.body.iter().position(|n| n.id == nid))
                .map(|p| p + 1)
                .unwrap_or(label.body.len());
            label.body.insert(pos, node);
            Ok(())
        }
    }
}

/// Check that [`insert_node`] would succeed, without mutating. Used before
/// removing a node during a move, so the reinsertion cannot be left hanging.
fn validate_insert_target(
    label: &mut LabelNode,
    parent_id: BlockId,
    parent_kind: BlockKind,
    parent_link: &NodeLink,
) -> Result<()> {
    match parent_kind {
        BlockKind::Label => Ok(()),
        BlockKind::Choice => {
            let NodeLink::Choice { owner, text } = parent_link else {
                return Err(stale(parent_id, "choice block has no synthetic link"));
            };
            choice_mut(label, *owner, text)
                .map(|_| ())
                .ok_or_else(|| stale(parent_id, "choice not found on owner menu"))
        }
        BlockKind::If => {
            let owner = parent_link
                .node_id()
                .ok_or_else(|| stale(parent_id, "if block has no node link"))?;
            branches_mut(label, owner)
                .and_then(|b| b.first_mut())
                .map(|_| ())
                .ok_or_else(|| stale(parent_id, "if node has no branches"))
        }
        BlockKind::Elif | BlockKind::Else => {
            let NodeLink::Branch { owner, index } = parent_link else {
                return Err(stale(parent_id, "branch block has no synthetic link"));
            };
            branches_mut(label, *owner)
                .and_then(|b| b.get_mut(*index))
                .map(|_| ())
                .ok_or_else(|| stale(parent_id, "branch not found on owner"))
        }
        // The fallback placement always succeeds.
        _ => Ok(()),
    }
}

/// How many of the first `upto` children occupy a slot in a statement body.
/// Comments and synthetic children carry no body slot, so a child index maps
/// to an AST index by counting only node-linked siblings before it.
fn node_index_before(children: &[Block], upto: usize) -> usize {
    children[..upto]
        .iter()
        .filter(|c| matches!(c.link, NodeLink::Node { .. }))
        .count()
}

/// As [`node_index_before`], for slots in a menu's choices array.
fn choice_index_before(children: &[Block], upto: usize) -> usize {
    children[..upto]
        .iter()
        .filter(|c| matches!(c.link, NodeLink::Choice { .. }))
        .count()
}

/// Collect the node ids linked anywhere in a block subtree.
fn collect_node_ids(block: &Block, out: &mut Vec<NodeId>) {
    if let Some(id) = block.link.node_id() {
        out.push(id);
    }
    for child in &block.children {
        collect_node_ids(child, out);
    }
}

/// After removing branch `removed` from `owner`, shift the branch links of
/// later siblings down by one.
fn renumber_branch_links(parent: &mut Block, owner: NodeId, removed: usize) {
    for child in &mut parent.children {
        if let NodeLink::Branch {
            owner: o,
            index: i,
        } = &mut child.link
        {
            if *o == owner && *i > removed {
                *i -= 1;
            }
        }
    }
}

fn stale(block: BlockId, detail: &str) -> SyncError {
    SyncError::StaleLink {
        block,
        detail: detail.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
