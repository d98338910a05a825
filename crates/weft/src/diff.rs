//! Differences between the graph and the semantic model.
//!
//! The graph is the source of truth after an edit. [`DiffBuilder`] walks it in
//! graph order and compares every collection and reference it derives with
//! the model's current values, producing [`Diff`] entries that bring the model
//! in line once applied.
//!
//! Collections produce the cheapest entries that reach the new value:
//!
//! - same members in another order: one [`Diff::ChangeFeature`];
//! - members added or removed, survivors still in order: only
//!   [`Diff::Delete`] and [`Diff::Create`];
//! - both: a [`Diff::ChangeFeature`] followed by the deletes and creates.
//!
//! Reference features only ever produce [`Diff::ChangeFeature`].

use std::{collections::HashSet, fmt};

use log::debug;

use weft_core::{identifier::Id, semantic::Element};

use crate::{
    graph::{InteractionGraph, MarkKind, NodeId, NodeKind},
    model::SemanticModel,
};

/// A feature of a model element that a [`Diff`] changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Lifelines of the interaction.
    Lifelines,
    /// Fragments of the interaction or of a combined fragment.
    Fragments,
    /// Messages of the interaction.
    Messages,
    /// Formal gates of the interaction.
    FormalGates,
    /// Actual gates of an interaction use.
    ActualGates,
    /// Lifelines covered by an occurrence, execution or fragment.
    Covered,
    /// Send end of a message.
    SendEvent,
    /// Receive end of a message.
    ReceiveEvent,
    /// Start occurrence of an execution specification.
    Start,
    /// Finish occurrence of an execution specification.
    Finish,
}

impl Feature {
    /// Returns true for ordered, owning collections.
    pub fn is_collection(self) -> bool {
        matches!(
            self,
            Self::Lifelines
                | Self::Fragments
                | Self::Messages
                | Self::FormalGates
                | Self::ActualGates
        )
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lifelines => "lifelines",
            Self::Fragments => "fragments",
            Self::Messages => "messages",
            Self::FormalGates => "formal_gates",
            Self::ActualGates => "actual_gates",
            Self::Covered => "covered",
            Self::SendEvent => "send_event",
            Self::ReceiveEvent => "receive_event",
            Self::Start => "start",
            Self::Finish => "finish",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Create,
    Delete,
    ChangeFeature,
}

/// One change to apply to the semantic model.
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Insert `element` into the collection `feature` of `owner` at `index`.
    Create {
        owner: Id,
        feature: Feature,
        element: Id,
        index: usize,
    },
    /// Remove `element` from the collection `feature` of `owner`.
    Delete {
        owner: Id,
        feature: Feature,
        element: Id,
    },
    /// Replace the value of `feature` of `owner`. References hold at most
    /// one id.
    ChangeFeature {
        owner: Id,
        feature: Feature,
        old: Vec<Id>,
        new: Vec<Id>,
    },
}

impl Diff {
    pub fn kind(&self) -> DiffKind {
        match self {
            Self::Create { .. } => DiffKind::Create,
            Self::Delete { .. } => DiffKind::Delete,
            Self::ChangeFeature { .. } => DiffKind::ChangeFeature,
        }
    }

    pub fn owner(&self) -> Id {
        match self {
            Self::Create { owner, .. }
            | Self::Delete { owner, .. }
            | Self::ChangeFeature { owner, .. } => *owner,
        }
    }

    pub fn feature(&self) -> Feature {
        match self {
            Self::Create { feature, .. }
            | Self::Delete { feature, .. }
            | Self::ChangeFeature { feature, .. } => *feature,
        }
    }
}

fn write_ids(f: &mut fmt::Formatter<'_>, ids: &[Id]) -> fmt::Result {
    write!(f, "[")?;
    for (index, id) in ids.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{id}")?;
    }
    write!(f, "]")
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create {
                owner,
                feature,
                element,
                index,
            } => write!(f, "create {owner}.{feature}[{index}] = {element}"),
            Self::Delete {
                owner,
                feature,
                element,
            } => write!(f, "delete {owner}.{feature} -= {element}"),
            Self::ChangeFeature {
                owner,
                feature,
                old,
                new,
            } => {
                write!(f, "change {owner}.{feature}: ")?;
                write_ids(f, old)?;
                write!(f, " -> ")?;
                write_ids(f, new)
            }
        }
    }
}

/// Compares a graph with a model.
pub(crate) struct DiffBuilder<'a, M: SemanticModel + ?Sized> {
    graph: &'a InteractionGraph,
    model: &'a M,
    diffs: Vec<Diff>,
}

impl<'a, M: SemanticModel + ?Sized> DiffBuilder<'a, M> {
    pub(crate) fn new(graph: &'a InteractionGraph, model: &'a M) -> Self {
        Self {
            graph,
            model,
            diffs: Vec::new(),
        }
    }

    pub(crate) fn build(mut self) -> Vec<Diff> {
        let interaction = self.model.interaction();

        self.lifelines(interaction);
        self.fragments(interaction);
        self.messages(interaction);
        self.gates(interaction);
        self.covered();
        self.references();

        debug!(count = self.diffs.len(); "Calculated differences");
        self.diffs
    }

    fn element_of(&self, node: NodeId) -> Option<Id> {
        self.graph.node(node).and_then(|node| node.element())
    }

    fn model_element(&self, id: Id) -> Option<&'a Element> {
        self.model.element(id)
    }

    fn lifelines(&mut self, interaction: Id) {
        let graph: Vec<Id> = self
            .graph
            .lifelines()
            .iter()
            .filter_map(|lifeline| self.element_of(*lifeline))
            .collect();
        let model = self.model.lifelines().to_vec();
        self.collection(interaction, Feature::Lifelines, &model, &graph);
    }

    /// Time-ordered fragment lists of the interaction and of every combined
    /// fragment, derived from the global node order.
    fn fragments(&mut self, interaction: Id) {
        let graph = self.graph;
        let root = graph.root();
        let mut lists: Vec<(NodeId, Vec<Id>)> = std::iter::once(root)
            .chain(graph.fragments().into_iter().filter(|fragment| {
                graph
                    .element_of_combined_fragment(*fragment)
                    .is_some()
            }))
            .map(|owner| (owner, Vec::new()))
            .collect();
        let mut seen: HashSet<Id> = HashSet::new();

        let mut push = |owner: NodeId, element: Id, lists: &mut Vec<(NodeId, Vec<Id>)>| {
            if !seen.insert(element) {
                return;
            }
            if let Some((_, list)) = lists.iter_mut().find(|(o, _)| *o == owner) {
                list.push(element);
            }
        };

        for node in graph.ordered_nodes() {
            let Some(kind) = graph.kind(*node) else {
                continue;
            };
            match kind {
                NodeKind::Occurrence | NodeKind::Destruction => {
                    let owner = graph.enclosing_fragment(*node);
                    if let Some(element) = self.element_of(*node) {
                        push(owner, element, &mut lists);
                    }
                    if let Some(execution) = graph.started_execution(*node) {
                        if let Some(element) = self.element_of(execution) {
                            push(graph.enclosing_fragment(execution), element, &mut lists);
                        }
                    }
                }
                NodeKind::Mark(MarkKind::Start) => {
                    let Some((fragment, _)) = graph.alignment_group(*node) else {
                        continue;
                    };
                    let owner = graph.parent(fragment).unwrap_or(root);
                    if let Some(element) = self.element_of(fragment) {
                        push(owner, element, &mut lists);
                    }
                }
                _ => {}
            }
        }

        for (owner, list) in lists {
            if owner == root {
                let model = self.model.fragments().to_vec();
                self.collection(interaction, Feature::Fragments, &model, &list);
                continue;
            }
            let Some(element) = self.element_of(owner) else {
                continue;
            };
            let model = self
                .model_element(element)
                .and_then(Element::as_combined_fragment)
                .map(|fragment| fragment.fragments().to_vec())
                .unwrap_or_default();
            self.collection(element, Feature::Fragments, &model, &list);
        }
    }

    /// Messages ordered by the row of their first end.
    fn messages(&mut self, interaction: Id) {
        let graph = self.graph;
        let position = |node: NodeId| {
            graph
                .ordered_nodes()
                .iter()
                .position(|n| *n == node)
                .unwrap_or(usize::MAX)
        };
        let mut keyed: Vec<((usize, usize), Id)> = graph
            .links()
            .filter_map(|id| {
                let link = graph.link(id)?;
                let element = link.element()?;
                let key = link
                    .ends()
                    .map(|end| (graph.row_of(end).unwrap_or(usize::MAX), position(end)))
                    .min()
                    .unwrap_or((usize::MAX, usize::MAX));
                Some((key, element))
            })
            .collect();
        keyed.sort_by_key(|(key, _)| *key);
        let list: Vec<Id> = keyed.into_iter().map(|(_, element)| element).collect();

        let model = self.model.messages().to_vec();
        self.collection(interaction, Feature::Messages, &model, &list);
    }

    fn gates(&mut self, interaction: Id) {
        let graph = self.graph;
        let elements = |gates: &[NodeId]| -> Vec<Id> {
            gates
                .iter()
                .filter_map(|gate| graph.node(*gate).and_then(|node| node.element()))
                .collect()
        };

        if let Some(parts) = graph.parts(graph.root()) {
            let list = elements(parts.inner_gates());
            let model = self.model.formal_gates().to_vec();
            self.collection(interaction, Feature::FormalGates, &model, &list);
        }

        for fragment in graph.fragments() {
            let Some(element) = graph.node(fragment).and_then(|node| node.element()) else {
                continue;
            };
            let Some(interaction_use) = self
                .model
                .element(element)
                .and_then(Element::as_interaction_use)
            else {
                continue;
            };
            let Some(parts) = graph.parts(fragment) else {
                continue;
            };
            let list = elements(parts.outer_gates());
            let model = interaction_use.gates().to_vec();
            self.collection(element, Feature::ActualGates, &model, &list);
        }
    }

    /// Covered lifelines of every occurrence, execution and fragment.
    fn covered(&mut self) {
        let graph = self.graph;
        let mut entries: Vec<(Id, Vec<Id>)> = Vec::new();

        for lifeline in graph.lifelines() {
            let Some(lifeline_element) = self.element_of(*lifeline) else {
                continue;
            };
            for node in graph.descendants(*lifeline) {
                let covering = matches!(
                    graph.kind(node),
                    Some(
                        NodeKind::Occurrence
                            | NodeKind::Destruction
                            | NodeKind::ExecutionSpecification
                    )
                );
                if let (true, Some(element)) = (covering, self.element_of(node)) {
                    entries.push((element, vec![lifeline_element]));
                }
            }
        }
        for fragment in graph.fragments() {
            let Some(element) = self.element_of(fragment) else {
                continue;
            };
            let covered = graph
                .covered_lifelines(fragment)
                .into_iter()
                .filter_map(|lifeline| self.element_of(lifeline))
                .collect();
            entries.push((element, covered));
        }

        for (element, covered) in entries {
            let model = self
                .model_element(element)
                .map(Element::covered)
                .unwrap_or_default();
            let same_members =
                model.len() == covered.len() && covered.iter().all(|id| model.contains(id));
            if !same_members {
                self.diffs.push(Diff::ChangeFeature {
                    owner: element,
                    feature: Feature::Covered,
                    old: model,
                    new: covered,
                });
            }
        }
    }

    /// Message ends and execution boundaries.
    fn references(&mut self) {
        let graph = self.graph;
        let mut entries: Vec<(Id, Feature, Option<Id>, Option<Id>)> = Vec::new();

        for id in graph.links() {
            let Some(link) = graph.link(id) else {
                continue;
            };
            let Some(element) = link.element() else {
                continue;
            };
            let message = self
                .model_element(element)
                .and_then(Element::as_message);
            let send = link.source().and_then(|node| self.element_of(node));
            let receive = link.target().and_then(|node| self.element_of(node));
            entries.push((element, Feature::SendEvent, message.and_then(|m| m.send()), send));
            entries.push((
                element,
                Feature::ReceiveEvent,
                message.and_then(|m| m.receive()),
                receive,
            ));
        }

        for lifeline in graph.lifelines() {
            for node in graph.descendants(*lifeline) {
                if graph.kind(node) != Some(NodeKind::ExecutionSpecification) {
                    continue;
                }
                let Some(element) = self.element_of(node) else {
                    continue;
                };
                let execution = self
                    .model_element(element)
                    .and_then(Element::as_execution);
                let children = graph.children(node);
                let start = children.first().and_then(|n| self.element_of(*n));
                let finish = children.last().and_then(|n| self.element_of(*n));
                let (old_start, old_finish) = (
                    execution.and_then(|e| e.start()),
                    execution.and_then(|e| e.finish()),
                );
                entries.push((element, Feature::Start, old_start, start));
                entries.push((element, Feature::Finish, old_finish, finish));
            }
        }

        for (owner, feature, old, new) in entries {
            if old != new {
                self.diffs.push(Diff::ChangeFeature {
                    owner,
                    feature,
                    old: old.into_iter().collect(),
                    new: new.into_iter().collect(),
                });
            }
        }
    }

    fn collection(&mut self, owner: Id, feature: Feature, old: &[Id], new: &[Id]) {
        self.diffs.extend(collection_diff(owner, feature, old, new));
    }
}

/// Entries turning the collection `old` into `new`.
///
/// Any difference replaces the whole list first, then reports the created
/// members with their index and the deleted ones.
pub(crate) fn collection_diff(owner: Id, feature: Feature, old: &[Id], new: &[Id]) -> Vec<Diff> {
    if old == new {
        return Vec::new();
    }
    let old_set: HashSet<&Id> = old.iter().collect();
    let new_set: HashSet<&Id> = new.iter().collect();

    let mut diffs = vec![Diff::ChangeFeature {
        owner,
        feature,
        old: old.to_vec(),
        new: new.to_vec(),
    }];
    diffs.extend(
        new.iter()
            .enumerate()
            .filter(|(_, id)| !old_set.contains(id))
            .map(|(index, element)| Diff::Create {
                owner,
                feature,
                element: *element,
                index,
            }),
    );
    diffs.extend(
        old.iter()
            .filter(|id| !new_set.contains(id))
            .map(|element| Diff::Delete {
                owner,
                feature,
                element: *element,
            }),
    );
    diffs
}

impl InteractionGraph {
    /// Compares the graph with `model` and returns the changes that make the
    /// model match the graph, in application order.
    pub fn calculate_differences<M: SemanticModel + ?Sized>(&self, model: &M) -> Vec<Diff> {
        DiffBuilder::new(self, model).build()
    }

    fn element_of_combined_fragment(&self, fragment: NodeId) -> Option<Id> {
        match self.kind(fragment)? {
            NodeKind::Fragment(crate::graph::FragmentKind::CombinedFragment) => {
                self.node(fragment).and_then(|node| node.element())
            }
            _ => None,
        }
    }
}
