//! Block tree model: kinds, categories, fields, and the block node.
//!
//! A [`Block`] is what the drag-and-drop surface renders and moves around.
//! Each non-comment block is paired with exactly one AST entity through its
//! [`NodeLink`]; container blocks own an ordered `children` list whose order
//! always matches the paired entity's statement order after a successful
//! operation.
//!
//! ## Design: BlockKind + Category
//!
//! `BlockKind` is the closed set of script statements the editor understands.
//! `Category` is *derived* display grouping — it is never stored or settable
//! independently, so the two can't drift apart.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::{BlockId, NodeLink};

/// What a block *is* — one variant per script statement kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BlockKind {
    /// The scope root — one per open label, never nested.
    Label,
    /// A line of dialogue, optionally spoken by a character.
    #[default]
    Dialogue,
    /// Scene change (replaces the background).
    Scene,
    /// Show an image, optionally with attributes.
    Show,
    /// Hide an image.
    Hide,
    /// Transition applied to the preceding visual change.
    With,
    /// A menu — container whose children are choices.
    Menu,
    /// One menu choice — synthetic, lives in the owning menu's array.
    Choice,
    /// Jump to a label.
    Jump,
    /// Call a label (returnable).
    Call,
    /// Return from a call.
    Return,
    /// Conditional — container for the true branch plus elif/else blocks.
    If,
    /// Additional conditional branch — synthetic, appended to the owning if.
    Elif,
    /// Fallback branch — synthetic, appended to the owning if.
    Else,
    /// Inline python statement.
    Python,
    /// Start music playback.
    PlayMusic,
    /// Stop music playback.
    StopMusic,
    /// Play a one-shot sound.
    PlaySound,
    /// Editor-only annotation. No AST entity at all.
    Comment,
}

impl BlockKind {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Label => "label",
            BlockKind::Dialogue => "dialogue",
            BlockKind::Scene => "scene",
            BlockKind::Show => "show",
            BlockKind::Hide => "hide",
            BlockKind::With => "with",
            BlockKind::Menu => "menu",
            BlockKind::Choice => "choice",
            BlockKind::Jump => "jump",
            BlockKind::Call => "call",
            BlockKind::Return => "return",
            BlockKind::If => "if",
            BlockKind::Elif => "elif",
            BlockKind::Else => "else",
            BlockKind::Python => "python",
            BlockKind::PlayMusic => "play_music",
            BlockKind::StopMusic => "stop_music",
            BlockKind::PlaySound => "play_sound",
            BlockKind::Comment => "comment",
        }
    }

    /// Display grouping, derived deterministically from the kind.
    pub fn category(&self) -> Category {
        match self {
            BlockKind::Dialogue
            | BlockKind::Scene
            | BlockKind::Show
            | BlockKind::Hide
            | BlockKind::With => Category::Story,
            BlockKind::Label
            | BlockKind::Menu
            | BlockKind::Choice
            | BlockKind::Jump
            | BlockKind::Call
            | BlockKind::Return
            | BlockKind::If
            | BlockKind::Elif
            | BlockKind::Else => Category::Flow,
            BlockKind::PlayMusic | BlockKind::StopMusic | BlockKind::PlaySound => Category::Audio,
            BlockKind::Python | BlockKind::Comment => Category::Logic,
        }
    }

    /// Whether blocks of this kind carry a `children` list.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            BlockKind::Label
                | BlockKind::Menu
                | BlockKind::Choice
                | BlockKind::If
                | BlockKind::Elif
                | BlockKind::Else
        )
    }

    /// Whether the paired AST data is an array element inside another node
    /// (choice in a menu, branch in an if) rather than a freestanding node.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, BlockKind::Choice | BlockKind::Elif | BlockKind::Else)
    }

    /// Whether this kind has any paired AST entity at all.
    pub fn has_ast(&self) -> bool {
        !matches!(self, BlockKind::Comment | BlockKind::Label)
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display grouping for the block palette. Derived from [`BlockKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Category {
    /// Dialogue and staging.
    Story,
    /// Labels, menus, jumps, conditionals.
    Flow,
    /// Music and sound.
    Audio,
    /// Python and comments.
    Logic,
}

impl Category {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Story => "story",
            Category::Flow => "flow",
            Category::Audio => "audio",
            Category::Logic => "logic",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed field value on a block.
///
/// Reference variants (`Character`, `Image`, `Audio`) carry the referenced
/// resource name as text; resolution against the project's resources is the
/// validator's job, not the model's.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Character(String),
    Image(String),
    Audio(String),
    Bool(bool),
    Expression(String),
}

impl FieldValue {
    /// The textual payload, for every variant that has one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s)
            | FieldValue::Character(s)
            | FieldValue::Image(s)
            | FieldValue::Audio(s)
            | FieldValue::Expression(s) => Some(s),
            FieldValue::Bool(_) => None,
        }
    }

    /// Whether the value is the typed zero (empty text / false).
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Bool(b) => !b,
            other => other.as_text().is_some_and(str::is_empty),
        }
    }
}

/// A named, typed field on a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
    /// Required fields are defaulted to the typed zero at creation, never
    /// left absent.
    pub required: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, value: FieldValue, required: bool) -> Self {
        Self {
            name: name.into(),
            value,
            required,
        }
    }
}

/// A visual tree node.
///
/// `children` is exclusively owned — no block is ever shared by two parents.
/// Only container kinds have a non-empty `children` list; the field is kept
/// on every block (empty for leaves) so traversal code stays uniform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub fields: Vec<Field>,
    /// Address of the paired AST entity. `None` for comments and the root.
    #[serde(default, skip_serializing_if = "NodeLink::is_none_link")]
    pub link: NodeLink,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl NodeLink {
    /// Helper for `#[serde(skip_serializing_if)]`.
    fn is_none_link(&self) -> bool {
        !self.is_linked()
    }
}

impl Block {
    /// Display grouping, derived from the kind.
    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field by name, mutably.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// The textual payload of a named field, empty string if absent.
    pub fn field_text(&self, name: &str) -> &str {
        self.field(name)
            .and_then(|f| f.value.as_text())
            .unwrap_or("")
    }

    /// Count of this block's descendants plus itself, excluding comments
    /// and the label root.
    pub fn countable_blocks(&self) -> usize {
        let own = usize::from(!matches!(self.kind, BlockKind::Comment | BlockKind::Label));
        own + self
            .children
            .iter()
            .map(Block::countable_blocks)
            .sum::<usize>()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NodeId;

    #[test]
    fn test_kind_parsing() {
        assert_eq!(BlockKind::from_str("dialogue"), Some(BlockKind::Dialogue));
        assert_eq!(BlockKind::from_str("MENU"), Some(BlockKind::Menu));
        // Multi-word kinds use the same snake_case form as_str() emits.
        assert_eq!(BlockKind::from_str("play_music"), Some(BlockKind::PlayMusic));
        assert_eq!(BlockKind::from_str("STOP_MUSIC"), Some(BlockKind::StopMusic));
        assert_eq!(BlockKind::from_str("play_sound"), Some(BlockKind::PlaySound));
        assert_eq!(BlockKind::from_str("nonsense"), None);
    }

    #[test]
    fn test_kind_as_str_roundtrip() {
        for kind in [
            BlockKind::Label,
            BlockKind::Dialogue,
            BlockKind::Scene,
            BlockKind::Show,
            BlockKind::Hide,
            BlockKind::With,
            BlockKind::Menu,
            BlockKind::Choice,
            BlockKind::Jump,
            BlockKind::Call,
            BlockKind::Return,
            BlockKind::If,
            BlockKind::Elif,
            BlockKind::Else,
            BlockKind::Python,
            BlockKind::PlayMusic,
            BlockKind::StopMusic,
            BlockKind::PlaySound,
            BlockKind::Comment,
        ] {
            assert_eq!(BlockKind::from_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_category_is_derived() {
        assert_eq!(BlockKind::Dialogue.category(), Category::Story);
        assert_eq!(BlockKind::Menu.category(), Category::Flow);
        assert_eq!(BlockKind::PlaySound.category(), Category::Audio);
        assert_eq!(BlockKind::Comment.category(), Category::Logic);
    }

    #[test]
    fn test_container_and_synthetic_kinds() {
        assert!(BlockKind::Label.is_container());
        assert!(BlockKind::Choice.is_container());
        assert!(!BlockKind::Dialogue.is_container());

        assert!(BlockKind::Choice.is_synthetic());
        assert!(BlockKind::Else.is_synthetic());
        assert!(!BlockKind::Menu.is_synthetic());

        assert!(!BlockKind::Comment.has_ast());
        assert!(!BlockKind::Label.has_ast());
        assert!(BlockKind::Choice.has_ast());
    }

    #[test]
    fn test_field_value_helpers() {
        assert_eq!(FieldValue::Text("hi".into()).as_text(), Some("hi"));
        assert_eq!(FieldValue::Bool(true).as_text(), None);
        assert!(FieldValue::Text(String::new()).is_empty());
        assert!(FieldValue::Bool(false).is_empty());
        assert!(!FieldValue::Expression("x > 1".into()).is_empty());
    }

    fn dialogue_block() -> Block {
        Block {
            id: BlockId::from_raw(1),
            kind: BlockKind::Dialogue,
            fields: vec![
                Field::new("speaker", FieldValue::Character("eileen".into()), false),
                Field::new("text", FieldValue::Text("Hello!".into()), true),
            ],
            link: NodeLink::Node {
                id: NodeId::from_raw(2),
            },
            children: Vec::new(),
        }
    }

    #[test]
    fn test_field_access() {
        let mut block = dialogue_block();
        assert_eq!(block.field_text("text"), "Hello!");
        assert_eq!(block.field_text("missing"), "");

        block.field_mut("text").unwrap().value = FieldValue::Text("Updated".into());
        assert_eq!(block.field_text("text"), "Updated");
    }

    #[test]
    fn test_countable_blocks_skips_comments_and_root() {
        let root = Block {
            id: BlockId::from_raw(10),
            kind: BlockKind::Label,
            fields: Vec::new(),
            link: NodeLink::None,
            children: vec![
                dialogue_block(),
                Block {
                    id: BlockId::from_raw(3),
                    kind: BlockKind::Comment,
                    fields: vec![Field::new("text", FieldValue::Text("note".into()), false)],
                    link: NodeLink::None,
                    children: Vec::new(),
                },
            ],
        };
        assert_eq!(root.countable_blocks(), 1);
    }

    #[test]
    fn test_block_serde_roundtrip() {
        let block = dialogue_block();
        let json = serde_json::to_string(&block).unwrap();
        let parsed: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(block, parsed);
    }

    #[test]
    fn test_block_skips_empty_link_and_children_in_json() {
        let block = Block {
            id: BlockId::from_raw(1),
            kind: BlockKind::Comment,
            fields: Vec::new(),
            link: NodeLink::None,
            children: Vec::new(),
        };
        let json = serde_json::to_string(&block).unwrap();
        assert!(!json.contains("link"));
        assert!(!json.contains("children"));
    }
}
