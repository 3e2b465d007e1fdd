//! Address resolution over both trees.
//!
//! Block lookups are depth-first over `children`. AST lookups recurse through
//! every body a label can reach: the label body itself, each menu choice's
//! body, and each if branch's body — any of which may contain further nested
//! containers.
//!
//! All lookups return `Option`; not-found is a normal condition the engine
//! maps to an error value, never a panic.

use shiori_types::{AstNode, Block, BlockId, Branch, LabelNode, MenuChoice, NodeId, NodeKind};

/// Where a block sits in the tree: its parent (None for the label root,
/// which is not removable) and its index within the parent's children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSite {
    pub parent: Option<BlockId>,
    pub index: usize,
}

impl BlockSite {
    /// Whether this is the label root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Depth-first search for a block by id.
pub fn find_block(root: &Block, id: BlockId) -> Option<&Block> {
    if root.id == id {
        return Some(root);
    }
    for child in &root.children {
        if let Some(found) = find_block(child, id) {
            return Some(found);
        }
    }
    None
}

/// Depth-first search for a block by id, mutably.
pub fn find_block_mut(root: &mut Block, id: BlockId) -> Option<&mut Block> {
    if root.id == id {
        return Some(root);
    }
    for child in &mut root.children {
        if let Some(found) = find_block_mut(child, id) {
            return Some(found);
        }
    }
    None
}

/// Locate a block's parent and index. The root locates with `parent: None`.
pub fn locate_block(root: &Block, id: BlockId) -> Option<BlockSite> {
    if root.id == id {
        return Some(BlockSite {
            parent: None,
            index: 0,
        });
    }
    locate_in(root, id)
}

fn locate_in(parent: &Block, id: BlockId) -> Option<BlockSite> {
    for (index, child) in parent.children.iter().enumerate() {
        if child.id == id {
            return Some(BlockSite {
                parent: Some(parent.id),
                index,
            });
        }
        if let Some(site) = locate_in(child, id) {
            return Some(site);
        }
    }
    None
}

/// Resolve a block together with its parent and index — the read-only query
/// the UI layer uses ("what would I be editing"). The root returns itself
/// with no parent and index 0.
pub fn find_block_with_parent(
    root: &Block,
    id: BlockId,
) -> Option<(&Block, Option<&Block>, usize)> {
    let site = locate_block(root, id)?;
    match site.parent {
        None => Some((root, None, 0)),
        Some(pid) => {
            let parent = find_block(root, pid)?;
            Some((&parent.children[site.index], Some(parent), site.index))
        }
    }
}

/// Depth-first search for an AST node by id, through every nested body.
pub fn find_node(label: &LabelNode, id: NodeId) -> Option<&AstNode> {
    find_in_body(&label.body, id)
}

fn find_in_body(body: &[AstNode], id: NodeId) -> Option<&AstNode> {
    for node in body {
        if node.id == id {
            return Some(node);
        }
        match &node.kind {
            NodeKind::Menu { choices } => {
                for choice in choices {
                    if let Some(found) = find_in_body(&choice.body, id) {
                        return Some(found);
                    }
                }
            }
            NodeKind::If { branches } => {
                for branch in branches {
                    if let Some(found) = find_in_body(&branch.body, id) {
                        return Some(found);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Depth-first search for an AST node by id, mutably.
pub fn find_node_mut(label: &mut LabelNode, id: NodeId) -> Option<&mut AstNode> {
    find_in_body_mut(&mut label.body, id)
}

fn find_in_body_mut(body: &mut [AstNode], id: NodeId) -> Option<&mut AstNode> {
    for node in body {
        if node.id == id {
            return Some(node);
        }
        match &mut node.kind {
            NodeKind::Menu { choices } => {
                for choice in choices {
                    if let Some(found) = find_in_body_mut(&mut choice.body, id) {
                        return Some(found);
                    }
                }
            }
            NodeKind::If { branches } => {
                for branch in branches {
                    if let Some(found) = find_in_body_mut(&mut branch.body, id) {
                        return Some(found);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Splice an AST node out of whichever body holds it.
pub fn remove_node(label: &mut LabelNode, id: NodeId) -> Option<AstNode> {
    remove_from_body(&mut label.body, id)
}

fn remove_from_body(body: &mut Vec<AstNode>, id: NodeId) -> Option<AstNode> {
    if let Some(pos) = body.iter().position(|n| n.id == id) {
        return Some(body.remove(pos));
    }
    for node in body {
        match &mut node.kind {
            NodeKind::Menu { choices } => {
                for choice in choices {
                    if let Some(removed) = remove_from_body(&mut choice.body, id) {
                        return Some(removed);
                    }
                }
            }
            NodeKind::If { branches } => {
                for branch in branches {
                    if let Some(removed) = remove_from_body(&mut branch.body, id) {
                        return Some(removed);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// The choices array of a menu node, mutably.
pub fn choices_mut(label: &mut LabelNode, owner: NodeId) -> Option<&mut Vec<MenuChoice>> {
    match &mut find_node_mut(label, owner)?.kind {
        NodeKind::Menu { choices } => Some(choices),
        _ => None,
    }
}

/// One choice of a menu node, located by its current text.
pub fn choice_mut<'a>(
    label: &'a mut LabelNode,
    owner: NodeId,
    text: &str,
) -> Option<&'a mut MenuChoice> {
    choices_mut(label, owner)?.iter_mut().find(|c| c.text == text)
}

/// The branches array of an if node, mutably.
pub fn branches_mut(label: &mut LabelNode, owner: NodeId) -> Option<&mut Vec<Branch>> {
    match &mut find_node_mut(label, owner)?.kind {
        NodeKind::If { branches } => Some(branches),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
