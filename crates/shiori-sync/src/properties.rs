//! Property sync: one block field edit, one AST mutation.
//!
//! Called by the engine after a field value has been written onto the block.
//! Each kind maps its known field names onto exactly one attribute of the
//! paired AST entity; unknown field names are a successful no-op so callers
//! can carry extra fields the sync layer does not know about.
//!
//! Choice text is special: the choice record is located by its *prior* text
//! (the discriminator the link still holds), mutated, and only then is the
//! block's link rewritten to the new text. Renaming last keeps the lookup
//! valid.

use shiori_types::{Block, BlockKind, FieldValue, LabelNode, NodeKind, NodeLink};

use crate::error::{Result, SyncError};
use crate::factory::{attribute_list, condition_or_true, non_empty, numeric};
use crate::resolve::{branches_mut, choice_mut, find_node_mut};

/// Apply the AST mutation for a field that has already been written to
/// `block`. `prior` is the field's previous value.
pub(crate) fn apply(
    label: &mut LabelNode,
    block: &mut Block,
    field: &str,
    prior: &FieldValue,
) -> Result<()> {
    let text = block.field_text(field).to_string();
    match block.kind {
        // No AST entity — trivially in sync.
        BlockKind::Comment | BlockKind::Label => Ok(()),
        BlockKind::Dialogue => match field {
            "speaker" => on_node(label, block, |k| {
                if let NodeKind::Dialogue { speaker, .. } = k {
                    *speaker = non_empty(&text);
                }
            }),
            "text" => on_node(label, block, |k| {
                if let NodeKind::Dialogue { text: t, .. } = k {
                    *t = text.clone();
                }
            }),
            _ => Ok(()),
        },
        BlockKind::Scene => match field {
            "image" => on_node(label, block, |k| {
                if let NodeKind::Scene { image, .. } = k {
                    *image = text.clone();
                }
            }),
            "transition" => on_node(label, block, |k| {
                if let NodeKind::Scene { transition, .. } = k {
                    *transition = non_empty(&text);
                }
            }),
            _ => Ok(()),
        },
        BlockKind::Show => match field {
            "character" => on_node(label, block, |k| {
                if let NodeKind::Show { image, .. } = k {
                    *image = text.clone();
                }
            }),
            "expression" => on_node(label, block, |k| {
                if let NodeKind::Show { attributes, .. } = k {
                    *attributes = attribute_list(&text);
                }
            }),
            _ => Ok(()),
        },
        BlockKind::Hide => match field {
            "image" => on_node(label, block, |k| {
                if let NodeKind::Hide { image } = k {
                    *image = text.clone();
                }
            }),
            _ => Ok(()),
        },
        BlockKind::With => match field {
            "transition" => on_node(label, block, |k| {
                if let NodeKind::With { transition } = k {
                    *transition = text.clone();
                }
            }),
            _ => Ok(()),
        },
        BlockKind::Jump | BlockKind::Call => match field {
            "target" => on_node(label, block, |k| match k {
                NodeKind::Jump { target } | NodeKind::Call { target } => *target = text.clone(),
                _ => {}
            }),
            _ => Ok(()),
        },
        BlockKind::If => match field {
            "condition" => on_node(label, block, |k| {
                if let NodeKind::If { branches } = k {
                    if let Some(first) = branches.first_mut() {
                        first.condition = Some(condition_or_true(&text));
                    }
                }
            }),
            _ => Ok(()),
        },
        BlockKind::Elif => match field {
            "condition" => {
                let NodeLink::Branch { owner, index } = block.link.clone() else {
                    return Err(stale(block, "elif block has no branch link"));
                };
                let branch = branches_mut(label, owner)
                    .and_then(|b| b.get_mut(index))
                    .ok_or_else(|| stale(block, "branch not found on owner"))?;
                branch.condition = Some(condition_or_true(&text));
                Ok(())
            }
            _ => Ok(()),
        },
        // The else branch has no condition to edit.
        BlockKind::Else => Ok(()),
        BlockKind::Python => match field {
            "code" => on_node(label, block, |k| {
                if let NodeKind::Python { code } = k {
                    *code = text.clone();
                }
            }),
            _ => Ok(()),
        },
        BlockKind::PlayMusic => match field {
            "file" => on_node(label, block, |k| {
                if let NodeKind::PlayMusic { file, .. } = k {
                    *file = text.clone();
                }
            }),
            "fade_in" => on_node(label, block, |k| {
                if let NodeKind::PlayMusic { fade_in, .. } = k {
                    *fade_in = numeric(&text);
                }
            }),
            _ => Ok(()),
        },
        BlockKind::StopMusic => match field {
            "fade_out" => on_node(label, block, |k| {
                if let NodeKind::StopMusic { fade_out } = k {
                    *fade_out = numeric(&text);
                }
            }),
            _ => Ok(()),
        },
        BlockKind::PlaySound => match field {
            "file" => on_node(label, block, |k| {
                if let NodeKind::PlaySound { file } = k {
                    *file = text.clone();
                }
            }),
            _ => Ok(()),
        },
        BlockKind::Choice => {
            let NodeLink::Choice { owner, text: link_text } = block.link.clone() else {
                return Err(stale(block, "choice block has no choice link"));
            };
            match field {
                "text" => {
                    // Located by the prior text; rename is the last step.
                    let prior_text = prior.as_text().unwrap_or("");
                    let choice = choice_mut(label, owner, prior_text)
                        .ok_or_else(|| stale(block, "choice not found by prior text"))?;
                    choice.text = text.clone();
                    block.link = NodeLink::Choice { owner, text };
                    Ok(())
                }
                "condition" => {
                    let choice = choice_mut(label, owner, &link_text)
                        .ok_or_else(|| stale(block, "choice not found by text"))?;
                    choice.condition = non_empty(&text);
                    Ok(())
                }
                _ => Ok(()),
            }
        }
        // No editable mapping for these kinds — every field is a no-op.
        BlockKind::Menu | BlockKind::Return => Ok(()),
    }
}

/// Resolve the block's direct node link and apply a mutation to the node.
fn on_node(label: &mut LabelNode, block: &Block, f: impl FnOnce(&mut NodeKind)) -> Result<()> {
    let id = block
        .link
        .node_id()
        .ok_or_else(|| stale(block, "block has no node link"))?;
    let node = find_node_mut(label, id).ok_or(SyncError::NodeNotFound(id))?;
    f(&mut node.kind);
    Ok(())
}

fn stale(block: &Block, detail: &str) -> SyncError {
    SyncError::StaleLink {
        block: block.id,
        detail: detail.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shiori_types::{AstNode, Block, BlockId, Branch, Field, MenuChoice, NodeId};

    fn label_with(node: AstNode) -> LabelNode {
        LabelNode {
            name: "start".into(),
            body: vec![node],
        }
    }

    fn linked_block(kind: BlockKind, fields: Vec<Field>, node_id: u64) -> Block {
        Block {
            id: BlockId::from_raw(100),
            kind,
            fields,
            link: NodeLink::Node {
                id: NodeId::from_raw(node_id),
            },
            children: Vec::new(),
        }
    }

    #[test]
    fn test_dialogue_text_sync() {
        let mut label = label_with(AstNode::new(
            NodeId::from_raw(1),
            NodeKind::Dialogue {
                speaker: None,
                text: "old".into(),
            },
        ));
        let mut block = linked_block(
            BlockKind::Dialogue,
            vec![Field::new("text", FieldValue::Text("Updated".into()), true)],
            1,
        );
        apply(&mut label, &mut block, "text", &FieldValue::Text("old".into())).unwrap();
        assert_eq!(
            label.body[0].kind,
            NodeKind::Dialogue {
                speaker: None,
                text: "Updated".into(),
            }
        );
    }

    #[test]
    fn test_unknown_field_is_noop_success() {
        let mut label = label_with(AstNode::new(
            NodeId::from_raw(1),
            NodeKind::Return,
        ));
        let mut block = linked_block(
            BlockKind::Return,
            vec![Field::new("color", FieldValue::Text("red".into()), false)],
            1,
        );
        // Unknown for the kind: succeeds without resolving anything.
        apply(&mut label, &mut block, "color", &FieldValue::Text(String::new())).unwrap();
    }

    #[test]
    fn test_show_expression_reparses_attributes() {
        let mut label = label_with(AstNode::new(
            NodeId::from_raw(1),
            NodeKind::Show {
                image: "eileen".into(),
                attributes: vec![],
            },
        ));
        let mut block = linked_block(
            BlockKind::Show,
            vec![Field::new(
                "expression",
                FieldValue::Expression("happy close".into()),
                false,
            )],
            1,
        );
        apply(&mut label, &mut block, "expression", &FieldValue::Expression(String::new()))
            .unwrap();
        let NodeKind::Show { attributes, .. } = &label.body[0].kind else {
            panic!("expected show node");
        };
        assert_eq!(attributes, &["happy".to_string(), "close".to_string()]);
    }

    #[test]
    fn test_missing_node_is_an_error() {
        let mut label = LabelNode::new("start");
        let mut block = linked_block(
            BlockKind::Jump,
            vec![Field::new("target", FieldValue::Text("ending".into()), true)],
            9,
        );
        let err = apply(&mut label, &mut block, "target", &FieldValue::Text(String::new()))
            .unwrap_err();
        assert_eq!(err, SyncError::NodeNotFound(NodeId::from_raw(9)));
    }

    #[test]
    fn test_elif_condition_targets_owning_branch() {
        let mut label = label_with(AstNode::new(
            NodeId::from_raw(1),
            NodeKind::If {
                branches: vec![
                    Branch::new(Some("a".into())),
                    Branch::new(Some("b".into())),
                ],
            },
        ));
        let mut block = Block {
            id: BlockId::from_raw(100),
            kind: BlockKind::Elif,
            fields: vec![Field::new(
                "condition",
                FieldValue::Expression("score > 3".into()),
                true,
            )],
            link: NodeLink::Branch {
                owner: NodeId::from_raw(1),
                index: 1,
            },
            children: Vec::new(),
        };
        apply(&mut label, &mut block, "condition", &FieldValue::Expression("b".into())).unwrap();
        let NodeKind::If { branches } = &label.body[0].kind else {
            panic!("expected if node");
        };
        assert_eq!(branches[0].condition.as_deref(), Some("a"));
        assert_eq!(branches[1].condition.as_deref(), Some("score > 3"));
    }

    #[test]
    fn test_choice_rename_rewrites_link() {
        let mut label = label_with(AstNode::new(
            NodeId::from_raw(1),
            NodeKind::Menu {
                choices: vec![MenuChoice::new("Go left")],
            },
        ));
        let mut block = Block {
            id: BlockId::from_raw(100),
            kind: BlockKind::Choice,
            fields: vec![Field::new("text", FieldValue::Text("Go right".into()), true)],
            link: NodeLink::Choice {
                owner: NodeId::from_raw(1),
                text: "Go left".into(),
            },
            children: Vec::new(),
        };
        apply(&mut label, &mut block, "text", &FieldValue::Text("Go left".into())).unwrap();

        let NodeKind::Menu { choices } = &label.body[0].kind else {
            panic!("expected menu node");
        };
        assert_eq!(choices[0].text, "Go right");
        // The link now carries the new discriminator.
        assert_eq!(
            block.link,
            NodeLink::Choice {
                owner: NodeId::from_raw(1),
                text: "Go right".into(),
            }
        );
    }

    #[test]
    fn test_choice_condition_located_by_current_text() {
        let mut label = label_with(AstNode::new(
            NodeId::from_raw(1),
            NodeKind::Menu {
                choices: vec![MenuChoice::new("Go")],
            },
        ));
        let mut block = Block {
            id: BlockId::from_raw(100),
            kind: BlockKind::Choice,
            fields: vec![
                Field::new("text", FieldValue::Text("Go".into()), true),
                Field::new("condition", FieldValue::Expression("brave".into()), false),
            ],
            link: NodeLink::Choice {
                owner: NodeId::from_raw(1),
                text: "Go".into(),
            },
            children: Vec::new(),
        };
        apply(&mut label, &mut block, "condition", &FieldValue::Expression(String::new()))
            .unwrap();
        let NodeKind::Menu { choices } = &label.body[0].kind else {
            panic!("expected menu node");
        };
        assert_eq!(choices[0].condition.as_deref(), Some("brave"));
    }
}
