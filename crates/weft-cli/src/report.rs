//! Summary of an edited interaction, written as text or TOML.

use std::fmt::Write as _;

use serde::Serialize;

use weft::{diff::Diff, graph::ColumnKind};

use crate::{
    error::CliError,
    session::{Handle, Session},
};

#[derive(Debug, Serialize)]
pub struct Report {
    pub interaction: String,
    pub differences: Vec<String>,
    pub rows: Vec<RowEntry>,
    pub columns: Vec<ColumnEntry>,
    pub nodes: Vec<NodeEntry>,
    pub messages: Vec<MessageEntry>,
}

#[derive(Debug, Serialize)]
pub struct RowEntry {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    pub nodes: usize,
}

#[derive(Debug, Serialize)]
pub struct ColumnEntry {
    pub index: usize,
    pub x: f32,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifeline: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NodeEntry {
    pub id: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[f32; 4]>,
}

#[derive(Debug, Serialize)]
pub struct MessageEntry {
    pub id: String,
    pub sort: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_row: Option<usize>,
}

impl Report {
    /// Collects the state of `session` after its edits were committed as
    /// `diffs`.
    pub fn new(name: &str, session: &Session, diffs: &[Diff]) -> Self {
        let graph = session.graph();
        let label = |handle| session.label_of(handle).map(str::to_string);

        let rows = graph
            .rows()
            .iter()
            .map(|row| RowEntry {
                index: row.index(),
                y: row.y(),
                nodes: row.nodes().len(),
            })
            .collect();

        let columns = graph
            .columns()
            .iter()
            .map(|column| ColumnEntry {
                index: column.index(),
                x: column.x(),
                kind: match column.kind() {
                    ColumnKind::Lifeline(_) => "lifeline".to_string(),
                    other => format!("{other:?}"),
                },
                lifeline: column.lifeline().and_then(|node| label(Handle::Node(node))),
            })
            .collect();

        let nodes = graph
            .lifelines()
            .iter()
            .chain(graph.ordered_nodes())
            .copied()
            .chain(graph.fragments())
            .filter_map(|id| {
                let node = graph.node(id)?;
                Some(NodeEntry {
                    id: id.to_string(),
                    kind: format!("{:?}", node.kind()),
                    label: label(Handle::Node(id)),
                    row: graph.row_of(id),
                    bounds: node
                        .bounds()
                        .map(|b| [b.min_x(), b.min_y(), b.max_x(), b.max_y()]),
                })
            })
            .collect();

        let messages = graph
            .links()
            .filter_map(|id| {
                let link = graph.link(id)?;
                Some(MessageEntry {
                    id: id.to_string(),
                    sort: link.sort().to_string(),
                    label: label(Handle::Link(id)),
                    send_row: link.source().and_then(|node| graph.row_of(node)),
                    receive_row: link.target().and_then(|node| graph.row_of(node)),
                })
            })
            .collect();

        Self {
            interaction: name.to_string(),
            differences: diffs.iter().map(ToString::to_string).collect(),
            rows,
            columns,
            nodes,
            messages,
        }
    }

    /// Plain text rendering, one section per table.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "interaction {}", self.interaction);

        let _ = writeln!(out, "\ndifferences ({})", self.differences.len());
        for diff in &self.differences {
            let _ = writeln!(out, "  {diff}");
        }

        let _ = writeln!(out, "\nrows ({})", self.rows.len());
        for row in &self.rows {
            match row.y {
                Some(y) => {
                    let _ = writeln!(out, "  {:>3}  y={y:<8} nodes={}", row.index, row.nodes);
                }
                None => {
                    let _ = writeln!(out, "  {:>3}  unplaced nodes={}", row.index, row.nodes);
                }
            }
        }

        let _ = writeln!(out, "\ncolumns ({})", self.columns.len());
        for column in &self.columns {
            let _ = writeln!(
                out,
                "  {:>3}  x={:<8} {}{}",
                column.index,
                column.x,
                column.kind,
                column.lifeline.as_deref().map(|l| format!(" {l}")).unwrap_or_default()
            );
        }

        let _ = writeln!(out, "\nnodes ({})", self.nodes.len());
        for node in &self.nodes {
            let _ = write!(out, "  {:<8} {}", node.id, node.kind);
            if let Some(label) = &node.label {
                let _ = write!(out, " [{label}]");
            }
            if let Some(row) = node.row {
                let _ = write!(out, " row={row}");
            }
            if let Some([x0, y0, x1, y1]) = node.bounds {
                let _ = write!(out, " ({x0}, {y0})-({x1}, {y1})");
            }
            out.push('\n');
        }

        let _ = writeln!(out, "\nmessages ({})", self.messages.len());
        for message in &self.messages {
            let _ = write!(out, "  {:<8} {}", message.id, message.sort);
            if let Some(label) = &message.label {
                let _ = write!(out, " [{label}]");
            }
            let row = |r: Option<usize>| r.map_or("-".to_string(), |r| r.to_string());
            let (send, receive) = (row(message.send_row), row(message.receive_row));
            let _ = writeln!(out, " rows {send} -> {receive}");
        }
        out
    }

    pub fn to_toml(&self) -> Result<String, CliError> {
        toml::to_string(self).map_err(|err| CliError::Report(err.to_string()))
    }
}
