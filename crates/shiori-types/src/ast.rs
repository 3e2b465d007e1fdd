//! Script AST model: the textual source of truth the block tree mirrors.
//!
//! A [`Script`] holds ordered [`LabelNode`]s; each label owns an ordered
//! statement `body`. Menu choices and if branches are *array elements* on
//! their owning node — they carry their own nested bodies but no independent
//! node id, which is why blocks address them through synthetic
//! [`NodeLink`](crate::NodeLink) variants.

use serde::{Deserialize, Serialize};

use crate::ids::NodeId;

/// Top-level container: an ordered list of labels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub labels: Vec<LabelNode>,
}

impl Script {
    /// Look up a label by name.
    pub fn label(&self, name: &str) -> Option<&LabelNode> {
        self.labels.iter().find(|l| l.name == name)
    }

    /// Look up a label by name, mutably.
    pub fn label_mut(&mut self, name: &str) -> Option<&mut LabelNode> {
        self.labels.iter_mut().find(|l| l.name == name)
    }
}

/// One label and its statement body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelNode {
    pub name: String,
    pub body: Vec<AstNode>,
}

impl LabelNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: Vec::new(),
        }
    }

    /// Count of AST entities in this label that pair with a countable block:
    /// every node, every menu choice, and every if branch past the first.
    pub fn countable_entities(&self) -> usize {
        self.body.iter().map(AstNode::countable_entities).sum()
    }
}

/// One statement. The id is process-unique and assigned at creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl AstNode {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self { id, kind }
    }

    /// See [`LabelNode::countable_entities`].
    pub fn countable_entities(&self) -> usize {
        match &self.kind {
            NodeKind::Menu { choices } => {
                1 + choices
                    .iter()
                    .map(|c| 1 + c.body.iter().map(AstNode::countable_entities).sum::<usize>())
                    .sum::<usize>()
            }
            NodeKind::If { branches } => {
                // The if block itself pairs with the first branch; every
                // later branch pairs with an elif/else block.
                1 + branches.len().saturating_sub(1)
                    + branches
                        .iter()
                        .flat_map(|b| &b.body)
                        .map(AstNode::countable_entities)
                        .sum::<usize>()
            }
            _ => 1,
        }
    }
}

/// Statement payload, one variant per statement kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A dialogue line. `speaker: None` is narration.
    Dialogue {
        speaker: Option<String>,
        text: String,
    },
    /// Background change, optionally with a transition.
    Scene {
        image: String,
        transition: Option<String>,
    },
    /// Show an image with zero or more attributes.
    Show {
        image: String,
        attributes: Vec<String>,
    },
    /// Hide an image.
    Hide { image: String },
    /// Transition statement.
    With { transition: String },
    /// A menu. Choices are array elements, not freestanding nodes.
    Menu { choices: Vec<MenuChoice> },
    /// Jump to a label.
    Jump { target: String },
    /// Call a label.
    Call { target: String },
    /// Return from a call.
    Return,
    /// A conditional. Branches are array elements; the first is the `if`
    /// branch, later ones are elifs, and a trailing `condition: None`
    /// branch is the else.
    If { branches: Vec<Branch> },
    /// Inline python.
    Python { code: String },
    /// Start music, with a fade-in in seconds.
    PlayMusic { file: String, fade_in: f64 },
    /// Stop music, with a fade-out in seconds.
    StopMusic { fade_out: f64 },
    /// One-shot sound.
    PlaySound { file: String },
}

/// One choice inside a menu node. Addressed by its current text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuChoice {
    pub text: String,
    /// Optional display condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<AstNode>,
}

impl MenuChoice {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            condition: None,
            body: Vec::new(),
        }
    }
}

/// One branch inside an if node. Addressed by its index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// `None` marks the else branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<AstNode>,
}

impl Branch {
    pub fn new(condition: Option<String>) -> Self {
        Self {
            condition,
            body: Vec::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
