//! The TOML interaction document read by the CLI.
//!
//! A document declares lifelines and an ordered list of edits:
//!
//! ```toml
//! name = "checkout"
//!
//! [[lifeline]]
//! label = "client"
//!
//! [[lifeline]]
//! label = "server"
//!
//! [[edit]]
//! op = "add_message"
//! label = "call"
//! sort = "synchronous"
//! from = { on = "client", y = 100 }
//! to = { on = "server", y = 100 }
//! ```
//!
//! Edits refer to lifelines and to the results of earlier edits by label.
//! The label `frame` stands for the interaction frame itself, the owner of
//! formal gates.

use serde::Deserialize;

use weft::semantic::{InteractionOperator, MessageSort};

use crate::error::CliError;

/// Label reserved for the interaction frame.
pub const FRAME: &str = "frame";

/// A parsed interaction document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub grid: Option<Grid>,

    #[serde(default, rename = "lifeline")]
    pub lifelines: Vec<LifelineDecl>,

    #[serde(default, rename = "edit")]
    pub edits: Vec<Edit>,
}

fn default_name() -> String {
    "interaction".to_string()
}

impl Document {
    /// Parses `src`, keeping the error location for reporting.
    pub fn parse(src: &str) -> Result<Self, CliError> {
        let document: Self = toml::from_str(src).map_err(|err| CliError::Document {
            message: err.message().to_string(),
            span: err.span(),
            src: src.to_string(),
        })?;
        document.validate(src)?;
        Ok(document)
    }

    fn validate(&self, src: &str) -> Result<(), CliError> {
        let mut labels: Vec<&str> = Vec::new();
        let declared = self.lifelines.iter().map(|decl| decl.label.as_str());
        let defined = self.edits.iter().filter_map(Edit::label);
        for label in declared.chain(defined) {
            if label == FRAME || labels.contains(&label) {
                return Err(CliError::Document {
                    message: format!("label `{label}` is reserved or defined twice"),
                    span: src
                        .find(&format!("\"{label}\""))
                        .map(|start| start..start + label.len() + 2),
                    src: src.to_string(),
                });
            }
            labels.push(label);
        }
        Ok(())
    }
}

/// Snapping grid applied to the coordinates of every edit.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Grid {
    pub spacing: f32,
    #[serde(default = "default_snap")]
    pub snap: bool,
}

fn default_snap() -> bool {
    true
}

/// A lifeline present before the first edit. Without `x` it is placed by
/// the layout in declaration order.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifelineDecl {
    pub label: String,
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub width: Option<f32>,
}

/// A message end: a lifeline, execution, interaction use or the frame, and
/// a y coordinate.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct End {
    pub on: String,
    pub y: f32,
}

/// Boundary moved by `resize_execution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Top,
    Bottom,
}

/// Message end moved by `nudge_message_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageEnd {
    Send,
    Receive,
}

/// One scripted edit.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    AddLifeline {
        label: String,
        x: f32,
        #[serde(default)]
        width: Option<f32>,
    },
    MoveLifeline {
        target: String,
        x: f32,
    },
    NudgeLifeline {
        target: String,
        dx: f32,
    },
    ResizeLifeline {
        target: String,
        dw: f32,
    },
    DeleteLifeline {
        target: String,
    },

    AddMessage {
        #[serde(default)]
        label: Option<String>,
        sort: MessageSort,
        #[serde(default)]
        from: Option<End>,
        #[serde(default)]
        to: Option<End>,
    },
    MoveMessage {
        target: String,
        #[serde(default)]
        from: Option<End>,
        #[serde(default)]
        to: Option<End>,
    },
    NudgeMessage {
        target: String,
        dy: f32,
    },
    NudgeMessageEnd {
        target: String,
        end: MessageEnd,
        dy: f32,
    },
    DeleteMessage {
        target: String,
    },

    AddExecution {
        #[serde(default)]
        label: Option<String>,
        on: String,
        y: f32,
        height: f32,
    },
    NudgeExecution {
        target: String,
        dy: f32,
    },
    ResizeExecution {
        target: String,
        side: Side,
        delta: f32,
    },
    MoveExecution {
        target: String,
        to: End,
    },
    /// Moves the start (`top`) or finish (`bottom`) occurrence to `y`.
    MoveExecutionOccurrence {
        target: String,
        side: Side,
        y: f32,
    },
    DeleteExecution {
        target: String,
    },

    AddInteractionUse {
        #[serde(default)]
        label: Option<String>,
        covers: Vec<String>,
        top: f32,
        bottom: f32,
    },
    NudgeInteractionUse {
        target: String,
        dy: f32,
    },
    ResizeInteractionUse {
        target: String,
        covers: Vec<String>,
        bottom: f32,
    },
    NudgeResizeInteractionUse {
        target: String,
        covers: Vec<String>,
        bottom: f32,
    },
    MoveInteractionUse {
        target: String,
        covers: Vec<String>,
        top: f32,
    },
    DeleteInteractionUse {
        target: String,
    },

    AddCombinedFragment {
        #[serde(default)]
        label: Option<String>,
        operator: InteractionOperator,
        covers: Vec<String>,
        top: f32,
        bottom: f32,
    },
    NudgeCombinedFragment {
        target: String,
        dy: f32,
    },
    DeleteCombinedFragment {
        target: String,
    },

    AddGate {
        #[serde(default)]
        label: Option<String>,
        on: String,
        y: f32,
    },
    NudgeGate {
        target: String,
        dy: f32,
    },
    MoveGate {
        target: String,
        to: End,
    },
}

impl Edit {
    /// The operation name as written in the document.
    pub fn op(&self) -> &'static str {
        match self {
            Self::AddLifeline { .. } => "add_lifeline",
            Self::MoveLifeline { .. } => "move_lifeline",
            Self::NudgeLifeline { .. } => "nudge_lifeline",
            Self::ResizeLifeline { .. } => "resize_lifeline",
            Self::DeleteLifeline { .. } => "delete_lifeline",
            Self::AddMessage { .. } => "add_message",
            Self::MoveMessage { .. } => "move_message",
            Self::NudgeMessage { .. } => "nudge_message",
            Self::NudgeMessageEnd { .. } => "nudge_message_end",
            Self::DeleteMessage { .. } => "delete_message",
            Self::AddExecution { .. } => "add_execution",
            Self::NudgeExecution { .. } => "nudge_execution",
            Self::ResizeExecution { .. } => "resize_execution",
            Self::MoveExecution { .. } => "move_execution",
            Self::MoveExecutionOccurrence { .. } => "move_execution_occurrence",
            Self::DeleteExecution { .. } => "delete_execution",
            Self::AddInteractionUse { .. } => "add_interaction_use",
            Self::NudgeInteractionUse { .. } => "nudge_interaction_use",
            Self::ResizeInteractionUse { .. } => "resize_interaction_use",
            Self::NudgeResizeInteractionUse { .. } => "nudge_resize_interaction_use",
            Self::MoveInteractionUse { .. } => "move_interaction_use",
            Self::DeleteInteractionUse { .. } => "delete_interaction_use",
            Self::AddCombinedFragment { .. } => "add_combined_fragment",
            Self::NudgeCombinedFragment { .. } => "nudge_combined_fragment",
            Self::DeleteCombinedFragment { .. } => "delete_combined_fragment",
            Self::AddGate { .. } => "add_gate",
            Self::NudgeGate { .. } => "nudge_gate",
            Self::MoveGate { .. } => "move_gate",
        }
    }

    /// The label an adding edit gives to its result.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::AddLifeline { label, .. } => Some(label.as_str()),
            Self::AddMessage { label, .. }
            | Self::AddExecution { label, .. }
            | Self::AddInteractionUse { label, .. }
            | Self::AddCombinedFragment { label, .. }
            | Self::AddGate { label, .. } => label.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lifelines_and_edits() {
        let src = r#"
            name = "doc"

            [[lifeline]]
            label = "client"

            [[lifeline]]
            label = "server"
            x = 200.0

            [[edit]]
            op = "add_message"
            label = "call"
            sort = "sync"
            from = { on = "client", y = 100 }
            to = { on = "server", y = 100 }

            [[edit]]
            op = "add_combined_fragment"
            operator = "opt"
            covers = ["client", "server"]
            top = 80
            bottom = 160
        "#;
        let document = Document::parse(src);
        assert!(document.is_err(), "`sync` is not a document sort name");

        let src = src.replace("\"sync\"", "\"synchronous\"");
        let document = Document::parse(&src).expect("document should parse");
        assert_eq!(document.name, "doc");
        assert_eq!(document.lifelines.len(), 2);
        assert_eq!(document.lifelines[1].x, Some(200.0));
        assert_eq!(document.edits.len(), 2);
        assert_eq!(document.edits[0].op(), "add_message");
        assert_eq!(document.edits[0].label(), Some("call"));
        assert!(matches!(
            &document.edits[1],
            Edit::AddCombinedFragment {
                operator: InteractionOperator::Opt,
                covers,
                ..
            } if covers.len() == 2
        ));
    }

    #[test]
    fn test_syntax_error_keeps_location() {
        let src = "name = \"broken\"\n[[lifeline]\nlabel = \"a\"\n";
        match Document::parse(src) {
            Err(CliError::Document { span, .. }) => assert!(span.is_some(), "toml reports a span"),
            other => panic!("expected a document error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_and_reserved_labels_are_rejected() {
        let duplicate = "[[lifeline]]\nlabel = \"a\"\n[[lifeline]]\nlabel = \"a\"\n";
        assert!(matches!(Document::parse(duplicate), Err(CliError::Document { .. })));

        let reserved = "[[lifeline]]\nlabel = \"frame\"\n";
        assert!(matches!(Document::parse(reserved), Err(CliError::Document { .. })));
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        let src = "[[edit]]\nop = \"explode\"\ntarget = \"a\"\n";
        assert!(matches!(Document::parse(src), Err(CliError::Document { .. })));
    }
}
