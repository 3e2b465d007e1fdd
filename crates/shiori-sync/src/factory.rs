//! Node factory: paired construction of blocks and AST nodes.
//!
//! [`create_block`] builds a fresh block with the kind's default field table —
//! every required field present and defaulted to its typed zero, never
//! absent. [`create_node`] maps a block's current field values onto a new AST
//! node of the matching kind; kinds with no standalone AST representation
//! (comment, label, and the synthetic choice/elif/else, which the engine
//! folds into their owner's array) yield `None`.

use shiori_types::{
    AstNode, Block, BlockKind, Branch, Field, FieldValue, IdAllocator, NodeKind, NodeLink,
};

/// The default field table for a block kind. Total: every kind is covered,
/// and callers can rely on the listed fields existing on a fresh block.
pub fn default_fields(kind: BlockKind) -> Vec<Field> {
    let text = |name: &str, required| Field::new(name, FieldValue::Text(String::new()), required);
    let expr =
        |name: &str, required| Field::new(name, FieldValue::Expression(String::new()), required);
    match kind {
        BlockKind::Label => vec![text("name", true)],
        BlockKind::Dialogue => vec![
            Field::new("speaker", FieldValue::Character(String::new()), false),
            text("text", true),
        ],
        BlockKind::Scene => vec![
            Field::new("image", FieldValue::Image(String::new()), true),
            text("transition", false),
        ],
        BlockKind::Show => vec![
            Field::new("character", FieldValue::Image(String::new()), true),
            expr("expression", false),
        ],
        BlockKind::Hide => vec![Field::new("image", FieldValue::Image(String::new()), true)],
        BlockKind::With => vec![text("transition", true)],
        BlockKind::Menu => Vec::new(),
        BlockKind::Choice => vec![text("text", true), expr("condition", false)],
        BlockKind::Jump | BlockKind::Call => vec![text("target", true)],
        BlockKind::Return => Vec::new(),
        BlockKind::If | BlockKind::Elif => vec![expr("condition", true)],
        BlockKind::Else => Vec::new(),
        BlockKind::Python => vec![expr("code", true)],
        BlockKind::PlayMusic => vec![
            Field::new("file", FieldValue::Audio(String::new()), true),
            expr("fade_in", false),
        ],
        BlockKind::StopMusic => vec![expr("fade_out", false)],
        BlockKind::PlaySound => vec![Field::new("file", FieldValue::Audio(String::new()), true)],
        BlockKind::Comment => vec![text("text", false)],
    }
}

/// Build a fresh block of the given kind: new id, default fields, no link
/// yet. The engine assigns the link when it places the paired AST entity.
pub fn create_block(ids: &mut IdAllocator, kind: BlockKind) -> Block {
    Block {
        id: ids.fresh_block(),
        kind,
        fields: default_fields(kind),
        link: NodeLink::None,
        children: Vec::new(),
    }
}

/// Map a block's current field values to a new AST node of the matching
/// kind. Returns `None` for kinds with no standalone node.
pub fn create_node(ids: &mut IdAllocator, block: &Block) -> Option<AstNode> {
    let kind = match block.kind {
        BlockKind::Dialogue => NodeKind::Dialogue {
            speaker: non_empty(block.field_text("speaker")),
            text: block.field_text("text").to_string(),
        },
        BlockKind::Scene => NodeKind::Scene {
            image: block.field_text("image").to_string(),
            transition: non_empty(block.field_text("transition")),
        },
        BlockKind::Show => NodeKind::Show {
            image: block.field_text("character").to_string(),
            attributes: attribute_list(block.field_text("expression")),
        },
        BlockKind::Hide => NodeKind::Hide {
            image: block.field_text("image").to_string(),
        },
        BlockKind::With => NodeKind::With {
            transition: block.field_text("transition").to_string(),
        },
        BlockKind::Menu => NodeKind::Menu { choices: Vec::new() },
        BlockKind::Jump => NodeKind::Jump {
            target: block.field_text("target").to_string(),
        },
        BlockKind::Call => NodeKind::Call {
            target: block.field_text("target").to_string(),
        },
        BlockKind::Return => NodeKind::Return,
        BlockKind::If => NodeKind::If {
            branches: vec![Branch::new(Some(condition_or_true(
                block.field_text("condition"),
            )))],
        },
        BlockKind::Python => NodeKind::Python {
            code: block.field_text("code").to_string(),
        },
        BlockKind::PlayMusic => NodeKind::PlayMusic {
            file: block.field_text("file").to_string(),
            fade_in: numeric(block.field_text("fade_in")),
        },
        BlockKind::StopMusic => NodeKind::StopMusic {
            fade_out: numeric(block.field_text("fade_out")),
        },
        BlockKind::PlaySound => NodeKind::PlaySound {
            file: block.field_text("file").to_string(),
        },
        // No standalone node: comments have no AST entity at all; the label
        // is the scope container itself; choices and elif/else branches are
        // folded into their owner's array by the engine.
        BlockKind::Comment
        | BlockKind::Label
        | BlockKind::Choice
        | BlockKind::Elif
        | BlockKind::Else => return None,
    };
    Some(AstNode::new(ids.fresh_node(), kind))
}

/// Empty text maps to the documented default `None`, never a missing value.
pub(crate) fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// A space-separated attribute list; empty input is an empty list.
pub(crate) fn attribute_list(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

/// Numeric fields parse leniently: anything unparseable is 0.0.
pub(crate) fn numeric(s: &str) -> f64 {
    s.trim().parse().unwrap_or(0.0)
}

/// An empty condition defaults to the always-true condition.
pub(crate) fn condition_or_true(s: &str) -> String {
    if s.trim().is_empty() {
        "True".to_string()
    } else {
        s.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
