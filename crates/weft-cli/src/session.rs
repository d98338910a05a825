//! Drives the graph service with the edits of a document.

use std::collections::HashMap;

use log::{debug, info};

use weft::{
    Anchor, EditError, ExecutionSide, GraphBuilder,
    config::AppConfig,
    diff::Diff,
    geometry::Bounds,
    graph::{InteractionGraph, LinkId, NodeId, NodeKind},
    identifier::Id,
    model::{GridSettings, Interaction, ViewLayout},
    semantic::MessageSort,
};

use crate::{
    document::{Document, Edit, End, FRAME, MessageEnd, Side},
    error::CliError,
};

/// What a label stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Node(NodeId),
    Link(LinkId),
}

/// A model, its graph and the labels the document has bound so far.
pub struct Session {
    model: Interaction,
    graph: InteractionGraph,
    grid: Option<GridSettings>,
    labels: HashMap<String, Handle>,
}

impl Session {
    /// Builds the model and graph for the lifelines `document` declares.
    pub fn open(document: &Document, config: AppConfig) -> Self {
        let interaction = Id::new(&document.name);
        let mut model = Interaction::new(interaction);
        let grid = document.grid.map(|grid| GridSettings::new(grid.spacing, grid.snap));
        let mut view = ViewLayout::new();
        if let Some(grid) = grid {
            view = view.with_grid(grid);
        }

        let layout = config.layout();
        let top = layout.origin().y();
        let mut declared = Vec::new();
        for decl in &document.lifelines {
            let element = model.add_lifeline(interaction.create_nested(Id::new(&decl.label)));
            if let Some(x) = decl.x {
                let width = decl.width.unwrap_or(layout.lifeline_width());
                let bottom = top + layout.lifeline_header_height();
                let bounds = Bounds::from_extents(x, top, x + width, bottom);
                view.insert(element, bounds);
            }
            declared.push((decl.label.clone(), element));
        }

        let graph = GraphBuilder::new(config).build(&model, &view);
        let labels = declared
            .into_iter()
            .filter_map(|(label, element)| {
                graph
                    .lifeline(element)
                    .map(|node| (label, Handle::Node(node)))
            })
            .collect();
        Self {
            model,
            graph,
            grid,
            labels,
        }
    }

    pub fn graph(&self) -> &InteractionGraph {
        &self.graph
    }

    /// Labels bound to `handle`, for naming things in reports.
    pub fn label_of(&self, handle: Handle) -> Option<&str> {
        self.labels
            .iter()
            .filter(|(_, bound)| **bound == handle)
            .map(|(label, _)| label.as_str())
            .min()
    }

    /// Runs `edits` in order, stopping at the first failure.
    pub fn run(&mut self, edits: &[Edit]) -> Result<(), CliError> {
        for (index, edit) in edits.iter().enumerate() {
            debug!(index, op = edit.op(); "Running edit");
            self.apply(index, edit)?;
        }
        info!(edits = edits.len(); "Edits applied");
        Ok(())
    }

    /// Computes the differences between the edited graph and the model, and
    /// applies them to the model.
    pub fn commit(&mut self) -> Result<Vec<Diff>, CliError> {
        let diffs = self.graph.calculate_differences(&self.model);
        self.model.apply(&diffs)?;
        Ok(diffs)
    }

    fn snap(&self, value: f32) -> f32 {
        self.grid.map_or(value, |grid| grid.snap(value))
    }

    fn resolve(&self, index: usize, op: &'static str, label: &str) -> Result<Handle, CliError> {
        if label == FRAME {
            return Ok(Handle::Node(self.graph.root()));
        }
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| CliError::UnknownLabel {
                index,
                op,
                label: label.to_string(),
            })
    }

    fn node(&self, index: usize, op: &'static str, label: &str) -> Result<NodeId, CliError> {
        match self.resolve(index, op, label)? {
            Handle::Node(node) => Ok(node),
            Handle::Link(_) => Err(CliError::WrongKind {
                index,
                op,
                label: label.to_string(),
                expected: "node",
            }),
        }
    }

    fn link(&self, index: usize, op: &'static str, label: &str) -> Result<LinkId, CliError> {
        match self.resolve(index, op, label)? {
            Handle::Link(link) => Ok(link),
            Handle::Node(_) => Err(CliError::WrongKind {
                index,
                op,
                label: label.to_string(),
                expected: "message",
            }),
        }
    }

    fn anchor(&self, index: usize, op: &'static str, end: &End) -> Result<Anchor, CliError> {
        Ok(Anchor::new(self.node(index, op, &end.on)?, self.snap(end.y)))
    }

    fn anchors(
        &self,
        index: usize,
        op: &'static str,
        from: Option<&End>,
        to: Option<&End>,
    ) -> Result<(Option<Anchor>, Option<Anchor>), CliError> {
        let source = from.map(|end| self.anchor(index, op, end)).transpose()?;
        let target = to.map(|end| self.anchor(index, op, end)).transpose()?;
        Ok((source, target))
    }

    /// The rect spanning the columns of the `covers` lifelines between `top`
    /// and `bottom`.
    fn covers_rect(
        &self,
        index: usize,
        op: &'static str,
        covers: &[String],
        top: f32,
        bottom: f32,
    ) -> Result<Bounds, CliError> {
        let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
        for label in covers {
            let node = self.node(index, op, label)?;
            let bounds = self
                .graph
                .bounds(node)
                .filter(|_| self.graph.kind(node) == Some(NodeKind::Lifeline))
                .ok_or_else(|| CliError::WrongKind {
                    index,
                    op,
                    label: label.clone(),
                    expected: "lifeline",
                })?;
            min_x = min_x.min(bounds.min_x());
            max_x = max_x.max(bounds.max_x());
        }
        Ok(Bounds::from_extents(min_x, self.snap(top), max_x, self.snap(bottom)))
    }

    fn bind(&mut self, label: Option<&str>, handle: Handle) {
        if let Some(label) = label {
            self.labels.insert(label.to_string(), handle);
        }
    }

    /// Binds `<label>.execution` and `<label>.reply` for a synchronous call.
    fn bind_call(&mut self, label: &str, call: LinkId) {
        let execution = self
            .graph
            .link(call)
            .and_then(|link| link.target())
            .and_then(|receive| self.graph.started_execution(receive));
        let Some(execution) = execution else {
            return;
        };
        let reply = self
            .graph
            .children(execution)
            .last()
            .and_then(|finish| self.graph.outgoing_link(*finish));
        self.bind(Some(format!("{label}.execution").as_str()), Handle::Node(execution));
        if let Some(reply) = reply {
            self.bind(Some(format!("{label}.reply").as_str()), Handle::Link(reply));
        }
    }

    fn apply(&mut self, index: usize, edit: &Edit) -> Result<(), CliError> {
        let op = edit.op();
        let failed = |source: EditError| CliError::Edit { index, op, source };

        match edit {
            Edit::AddLifeline { label, x, width } => {
                let x = self.snap(*x);
                let width = width.unwrap_or(self.graph.config().lifeline_width());
                let top = self.graph.config().origin().y();
                let bottom = top + self.graph.config().lifeline_header_height();
                let rect = Bounds::from_extents(x, top, x + width, bottom);
                let node = self.graph.add_lifeline(&mut self.model, &rect).map_err(failed)?;
                self.bind(Some(label.as_str()), Handle::Node(node));
            }
            Edit::MoveLifeline { target, x } => {
                let node = self.node(index, op, target)?;
                let x = self.snap(*x);
                self.graph.move_lifeline(node, x).map_err(failed)?;
            }
            Edit::NudgeLifeline { target, dx } => {
                let node = self.node(index, op, target)?;
                self.graph.nudge_lifeline(node, *dx).map_err(failed)?;
            }
            Edit::ResizeLifeline { target, dw } => {
                let node = self.node(index, op, target)?;
                self.graph.resize_lifeline(node, *dw).map_err(failed)?;
            }
            Edit::DeleteLifeline { target } => {
                let node = self.node(index, op, target)?;
                self.graph.delete_lifeline(node).map_err(failed)?;
            }

            Edit::AddMessage { label, sort, from, to } => {
                let (source, target) = self.anchors(index, op, from.as_ref(), to.as_ref())?;
                let link = self
                    .graph
                    .add_message(&mut self.model, *sort, source, target)
                    .map_err(failed)?;
                self.bind(label.as_deref(), Handle::Link(link));
                if let (Some(label), MessageSort::Synchronous) = (label, sort) {
                    self.bind_call(label, link);
                }
            }
            Edit::MoveMessage { target, from, to } => {
                let link = self.link(index, op, target)?;
                let (source, target) = self.anchors(index, op, from.as_ref(), to.as_ref())?;
                self.graph
                    .move_message(&mut self.model, link, source, target)
                    .map_err(failed)?;
            }
            Edit::NudgeMessage { target, dy } => {
                let link = self.link(index, op, target)?;
                self.graph.nudge_message(link, *dy).map_err(failed)?;
            }
            Edit::NudgeMessageEnd { target, end, dy } => {
                let link = self.link(index, op, target)?;
                let node = self.graph.link(link).and_then(|link| match end {
                    MessageEnd::Send => link.source(),
                    MessageEnd::Receive => link.target(),
                });
                let node = node.ok_or_else(|| failed(EditError::precondition(op)))?;
                self.graph.nudge_message_end(node, *dy).map_err(failed)?;
            }
            Edit::DeleteMessage { target } => {
                let link = self.link(index, op, target)?;
                self.graph.delete_message(link).map_err(failed)?;
            }

            Edit::AddExecution { label, on, y, height } => {
                let lifeline = self.node(index, op, on)?;
                let y = self.snap(*y);
                let node = self
                    .graph
                    .add_execution_specification(&mut self.model, lifeline, y, *height)
                    .map_err(failed)?;
                self.bind(label.as_deref(), Handle::Node(node));
            }
            Edit::NudgeExecution { target, dy } => {
                let node = self.node(index, op, target)?;
                self.graph.nudge_execution_specification(node, *dy).map_err(failed)?;
            }
            Edit::ResizeExecution { target, side, delta } => {
                let node = self.node(index, op, target)?;
                let side = match side {
                    Side::Top => ExecutionSide::Top,
                    Side::Bottom => ExecutionSide::Bottom,
                };
                self.graph
                    .resize_execution_specification(node, side, *delta)
                    .map_err(failed)?;
            }
            Edit::MoveExecution { target, to } => {
                let node = self.node(index, op, target)?;
                let anchor = self.anchor(index, op, to)?;
                self.graph
                    .move_execution_specification(&mut self.model, node, anchor)
                    .map_err(failed)?;
            }
            Edit::MoveExecutionOccurrence { target, side, y } => {
                let node = self.node(index, op, target)?;
                let children = self.graph.children(node);
                let occurrence = match side {
                    Side::Top => children.first(),
                    Side::Bottom => children.last(),
                };
                let occurrence = occurrence
                    .copied()
                    .ok_or_else(|| failed(EditError::precondition(op)))?;
                let y = self.snap(*y);
                self.graph.move_execution_occurrence(occurrence, y).map_err(failed)?;
            }
            Edit::DeleteExecution { target } => {
                let node = self.node(index, op, target)?;
                self.graph.delete_execution_specification(node).map_err(failed)?;
            }

            Edit::AddInteractionUse { label, covers, top, bottom } => {
                let rect = self.covers_rect(index, op, covers, *top, *bottom)?;
                let node = self
                    .graph
                    .add_interaction_use(&mut self.model, &rect)
                    .map_err(failed)?;
                self.bind(label.as_deref(), Handle::Node(node));
            }
            Edit::NudgeInteractionUse { target, dy } => {
                let node = self.node(index, op, target)?;
                self.graph.nudge_interaction_use(node, *dy).map_err(failed)?;
            }
            Edit::ResizeInteractionUse { target, covers, bottom } => {
                let node = self.node(index, op, target)?;
                let top = self.graph.span(node).map_or(*bottom, |(top, _)| top);
                let rect = self.covers_rect(index, op, covers, top, *bottom)?;
                self.graph.resize_interaction_use(node, &rect).map_err(failed)?;
            }
            Edit::NudgeResizeInteractionUse { target, covers, bottom } => {
                let node = self.node(index, op, target)?;
                let top = self.graph.span(node).map_or(*bottom, |(top, _)| top);
                let rect = self.covers_rect(index, op, covers, top, *bottom)?;
                self.graph.nudge_resize_interaction_use(node, &rect).map_err(failed)?;
            }
            Edit::MoveInteractionUse { target, covers, top } => {
                let node = self.node(index, op, target)?;
                let height = self.graph.span(node).map_or(0.0, |(top, bottom)| bottom - top);
                let rect = self.covers_rect(index, op, covers, *top, *top + height)?;
                self.graph.move_interaction_use(node, &rect).map_err(failed)?;
            }
            Edit::DeleteInteractionUse { target } => {
                let node = self.node(index, op, target)?;
                self.graph.delete_interaction_use(node).map_err(failed)?;
            }

            Edit::AddCombinedFragment {
                label,
                operator,
                covers,
                top,
                bottom,
            } => {
                let rect = self.covers_rect(index, op, covers, *top, *bottom)?;
                let node = self
                    .graph
                    .add_combined_fragment(&mut self.model, *operator, &rect)
                    .map_err(failed)?;
                self.bind(label.as_deref(), Handle::Node(node));
            }
            Edit::NudgeCombinedFragment { target, dy } => {
                let node = self.node(index, op, target)?;
                self.graph.nudge_combined_fragment(node, *dy).map_err(failed)?;
            }
            Edit::DeleteCombinedFragment { target } => {
                let node = self.node(index, op, target)?;
                self.graph.delete_combined_fragment(node).map_err(failed)?;
            }

            Edit::AddGate { label, on, y } => {
                let owner = self.node(index, op, on)?;
                let y = self.snap(*y);
                let node = self.graph.add_gate(&mut self.model, owner, y).map_err(failed)?;
                self.bind(label.as_deref(), Handle::Node(node));
            }
            Edit::NudgeGate { target, dy } => {
                let node = self.node(index, op, target)?;
                self.graph.nudge_gate(node, *dy).map_err(failed)?;
            }
            Edit::MoveGate { target, to } => {
                let node = self.node(index, op, target)?;
                let anchor = self.anchor(index, op, to)?;
                let end = self
                    .graph
                    .move_gate(&mut self.model, node, anchor)
                    .map_err(failed)?;
                self.bind(Some(target.as_str()), Handle::Node(end));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(src: &str) -> (Document, Session) {
        let document = Document::parse(src).expect("document should parse");
        let session = Session::open(&document, AppConfig::default());
        (document, session)
    }

    const TWO_LIFELINES: &str = r#"
        name = "session"

        [[lifeline]]
        label = "client"

        [[lifeline]]
        label = "server"
    "#;

    #[test]
    fn test_open_binds_declared_lifelines() {
        let (_, session) = open(TWO_LIFELINES);
        assert_eq!(session.graph().lifelines().len(), 2);
        let client = session.graph().lifelines()[0];
        assert_eq!(session.label_of(Handle::Node(client)), Some("client"));
    }

    #[test]
    fn test_sync_call_binds_execution_and_reply() {
        let src = format!(
            "{TWO_LIFELINES}\n{}",
            r#"
            [[edit]]
            op = "add_message"
            label = "call"
            sort = "synchronous"
            from = { on = "client", y = 100 }
            to = { on = "server", y = 100 }

            [[edit]]
            op = "nudge_execution"
            target = "call.execution"
            dy = 20
            "#
        );
        let (document, mut session) = open(&src);
        session.run(&document.edits).expect("edits should run");

        assert!(matches!(session.labels.get("call.execution"), Some(Handle::Node(_))));
        assert!(matches!(session.labels.get("call.reply"), Some(Handle::Link(_))));
        let diffs = session.commit().expect("differences should apply");
        assert!(!diffs.is_empty(), "the call shows up in the model");
        assert!(session.commit().expect("second commit").is_empty(), "model is in sync");
    }

    #[test]
    fn test_unknown_and_mistyped_labels() {
        let unknown = format!(
            "{TWO_LIFELINES}\n{}",
            "[[edit]]\nop = \"delete_lifeline\"\ntarget = \"nobody\"\n"
        );
        let (document, mut session) = open(&unknown);
        assert!(matches!(
            session.run(&document.edits),
            Err(CliError::UnknownLabel { index: 0, .. })
        ));

        let mistyped = format!(
            "{TWO_LIFELINES}\n{}",
            "[[edit]]\nop = \"delete_message\"\ntarget = \"client\"\n"
        );
        let (document, mut session) = open(&mistyped);
        assert!(matches!(
            session.run(&document.edits),
            Err(CliError::WrongKind { expected: "message", .. })
        ));
    }

    #[test]
    fn test_refused_edit_reports_its_index() {
        let src = format!(
            "{TWO_LIFELINES}\n{}",
            r#"
            [[edit]]
            op = "add_message"
            sort = "asynchronous"
            from = { on = "client", y = 200 }
            to = { on = "server", y = 120 }
            "#
        );
        let (document, mut session) = open(&src);
        let result = session.run(&document.edits);
        assert!(
            matches!(
                result,
                Err(CliError::Edit {
                    index: 0,
                    op: "add_message",
                    source: EditError::Precondition(_)
                })
            ),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn test_grid_snaps_coordinates() {
        let src = r#"
            [grid]
            spacing = 20

            [[lifeline]]
            label = "a"

            [[lifeline]]
            label = "b"

            [[edit]]
            op = "add_message"
            label = "m"
            sort = "asynchronous"
            from = { on = "a", y = 97 }
            to = { on = "b", y = 103 }
        "#;
        let (document, mut session) = open(src);
        session.run(&document.edits).expect("edits should run");

        let Some(Handle::Link(link)) = session.labels.get("m").copied() else {
            panic!("message label missing");
        };
        let ends: Vec<_> = session
            .graph()
            .link(link)
            .map(|link| link.ends().filter_map(|end| session.graph().y(end)).collect())
            .unwrap_or_default();
        assert_eq!(ends, vec![100.0, 100.0]);
    }

    #[test]
    fn test_nudge_message_end_moves_only_the_receive() {
        let src = format!(
            "{TWO_LIFELINES}\n{}",
            r#"
            [[edit]]
            op = "add_message"
            label = "m"
            sort = "asynchronous"
            from = { on = "client", y = 100 }
            to = { on = "server", y = 100 }

            [[edit]]
            op = "nudge_message_end"
            target = "m"
            end = "receive"
            dy = 30
            "#
        );
        let (document, mut session) = open(&src);
        session.run(&document.edits).expect("edits should run");

        let Some(Handle::Link(link)) = session.labels.get("m").copied() else {
            panic!("message label missing");
        };
        let ends: Vec<_> = session
            .graph()
            .link(link)
            .map(|link| link.ends().filter_map(|end| session.graph().y(end)).collect())
            .unwrap_or_default();
        assert_eq!(ends, vec![100.0, 130.0]);
    }
}
