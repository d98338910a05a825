//! Semantic element types understood by the interaction graph.
//!
//! The interaction graph sits on top of a sequence-diagram semantic model. It
//! does not decide which UML concepts exist; it only needs a small, closed set
//! of element kinds and the references between them:
//!
//! ```text
//! Interaction
//!  ├─ lifelines ........ Lifeline
//!  ├─ formal gates ..... Gate
//!  ├─ messages ......... Message ── send/receive ──► Occurrence | Gate
//!  └─ fragments ........ Occurrence            (covered: one lifeline)
//!                        ExecutionSpecification (covered, start, finish)
//!                        InteractionUse        (covered: many, actual gates)
//!                        CombinedFragment      (covered: many, enclosed fragments)
//! ```
//!
//! Elements are represented by the [`Element`] tagged union and dispatched by
//! pattern matching. Every reference between elements is an [`Id`].

use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::identifier::Id;

/// The sort of a message, following the usual sequence-diagram vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSort {
    #[default]
    Synchronous,
    Asynchronous,
    Reply,
    Create,
    Delete,
    Lost,
    Found,
}

impl MessageSort {
    /// Returns true for sorts that have no sending occurrence.
    pub fn is_found(self) -> bool {
        self == Self::Found
    }

    /// Returns true for sorts that have no receiving occurrence.
    pub fn is_lost(self) -> bool {
        self == Self::Lost
    }
}

impl fmt::Display for MessageSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Synchronous => "synchronous",
            Self::Asynchronous => "asynchronous",
            Self::Reply => "reply",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Lost => "lost",
            Self::Found => "found",
        };
        write!(f, "{name}")
    }
}

impl FromStr for MessageSort {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "synchronous" | "sync" => Ok(Self::Synchronous),
            "asynchronous" | "async" => Ok(Self::Asynchronous),
            "reply" => Ok(Self::Reply),
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            "lost" => Ok(Self::Lost),
            "found" => Ok(Self::Found),
            _ => Err("Invalid message sort"),
        }
    }
}

/// What a point-in-time event on a lifeline stands for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OccurrenceKind {
    /// The send or receive end of a message.
    #[default]
    Message,
    /// The start or finish of an execution specification not tied to a message.
    Execution,
    /// The end of a lifeline.
    Destruction,
}

/// Operator of a combined fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionOperator {
    Alt,
    #[default]
    Opt,
    Loop,
    Par,
    Break,
    Critical,
    Neg,
    Assert,
    Strict,
    Seq,
    Ignore,
    Consider,
}

impl fmt::Display for InteractionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Alt => "alt",
            Self::Opt => "opt",
            Self::Loop => "loop",
            Self::Par => "par",
            Self::Break => "break",
            Self::Critical => "critical",
            Self::Neg => "neg",
            Self::Assert => "assert",
            Self::Strict => "strict",
            Self::Seq => "seq",
            Self::Ignore => "ignore",
            Self::Consider => "consider",
        };
        write!(f, "{name}")
    }
}

/// A message between two ends.
///
/// Either end may be an occurrence or a gate. A lost message has no receive
/// end and a found message has no send end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    sort: MessageSort,
    send: Option<Id>,
    receive: Option<Id>,
}

impl Message {
    /// Creates a new message of the given sort with both ends unset.
    pub fn new(sort: MessageSort) -> Self {
        Self {
            sort,
            send: None,
            receive: None,
        }
    }

    /// Returns a copy of the message with the given ends.
    pub fn with_ends(mut self, send: Option<Id>, receive: Option<Id>) -> Self {
        self.send = send;
        self.receive = receive;
        self
    }

    pub fn sort(&self) -> MessageSort {
        self.sort
    }

    pub fn send(&self) -> Option<Id> {
        self.send
    }

    pub fn receive(&self) -> Option<Id> {
        self.receive
    }

    pub fn set_send(&mut self, send: Option<Id>) {
        self.send = send;
    }

    pub fn set_receive(&mut self, receive: Option<Id>) {
        self.receive = receive;
    }
}

/// A point-in-time event on one lifeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Occurrence {
    kind: OccurrenceKind,
    covered: Option<Id>,
}

impl Occurrence {
    /// Creates a new occurrence of the given kind covering `covered`.
    pub fn new(kind: OccurrenceKind, covered: Option<Id>) -> Self {
        Self { kind, covered }
    }

    pub fn kind(&self) -> OccurrenceKind {
        self.kind
    }

    /// The lifeline this occurrence happens on.
    pub fn covered(&self) -> Option<Id> {
        self.covered
    }

    pub fn set_covered(&mut self, covered: Option<Id>) {
        self.covered = covered;
    }
}

/// An interval of activity on a lifeline, bounded by two occurrences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionSpecification {
    covered: Option<Id>,
    start: Option<Id>,
    finish: Option<Id>,
}

impl ExecutionSpecification {
    /// Creates a new execution specification.
    pub fn new(covered: Option<Id>, start: Option<Id>, finish: Option<Id>) -> Self {
        Self {
            covered,
            start,
            finish,
        }
    }

    pub fn covered(&self) -> Option<Id> {
        self.covered
    }

    pub fn start(&self) -> Option<Id> {
        self.start
    }

    pub fn finish(&self) -> Option<Id> {
        self.finish
    }

    pub fn set_covered(&mut self, covered: Option<Id>) {
        self.covered = covered;
    }

    pub fn set_start(&mut self, start: Option<Id>) {
        self.start = start;
    }

    pub fn set_finish(&mut self, finish: Option<Id>) {
        self.finish = finish;
    }
}

/// A reference to another interaction, drawn as a box across the covered lifelines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionUse {
    covered: Vec<Id>,
    gates: Vec<Id>,
}

impl InteractionUse {
    /// Creates a new interaction use covering the given lifelines.
    pub fn new(covered: Vec<Id>) -> Self {
        Self {
            covered,
            gates: Vec::new(),
        }
    }

    pub fn covered(&self) -> &[Id] {
        &self.covered
    }

    /// The actual gates on the border of the box.
    pub fn gates(&self) -> &[Id] {
        &self.gates
    }

    pub fn set_covered(&mut self, covered: Vec<Id>) {
        self.covered = covered;
    }

    pub fn set_gates(&mut self, gates: Vec<Id>) {
        self.gates = gates;
    }
}

/// A boxed region with an operator, enclosing the fragments inside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedFragment {
    operator: InteractionOperator,
    covered: Vec<Id>,
    fragments: Vec<Id>,
}

impl CombinedFragment {
    /// Creates a new, empty combined fragment.
    pub fn new(operator: InteractionOperator, covered: Vec<Id>) -> Self {
        Self {
            operator,
            covered,
            fragments: Vec::new(),
        }
    }

    pub fn operator(&self) -> InteractionOperator {
        self.operator
    }

    pub fn covered(&self) -> &[Id] {
        &self.covered
    }

    /// The enclosed fragments, in time order.
    pub fn fragments(&self) -> &[Id] {
        &self.fragments
    }

    pub fn set_covered(&mut self, covered: Vec<Id>) {
        self.covered = covered;
    }

    pub fn set_fragments(&mut self, fragments: Vec<Id>) {
        self.fragments = fragments;
    }
}

/// The kind of an element, used when asking a model to create a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Lifeline,
    Message(MessageSort),
    Occurrence(OccurrenceKind),
    ExecutionSpecification,
    Gate,
    InteractionUse,
    CombinedFragment(InteractionOperator),
}

impl ElementKind {
    /// Short name used when generating element ids.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Lifeline => "Lifeline",
            Self::Message(_) => "Message",
            Self::Occurrence(OccurrenceKind::Destruction) => "Destruction",
            Self::Occurrence(_) => "Occurrence",
            Self::ExecutionSpecification => "Execution",
            Self::Gate => "Gate",
            Self::InteractionUse => "InteractionUse",
            Self::CombinedFragment(_) => "CombinedFragment",
        }
    }
}

/// A semantic element of an interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Lifeline,
    Message(Message),
    Occurrence(Occurrence),
    ExecutionSpecification(ExecutionSpecification),
    Gate,
    InteractionUse(InteractionUse),
    CombinedFragment(CombinedFragment),
}

impl Element {
    /// Creates a blank element of the given kind.
    pub fn new(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Lifeline => Self::Lifeline,
            ElementKind::Message(sort) => Self::Message(Message::new(sort)),
            ElementKind::Occurrence(kind) => Self::Occurrence(Occurrence::new(kind, None)),
            ElementKind::ExecutionSpecification => {
                Self::ExecutionSpecification(ExecutionSpecification::default())
            }
            ElementKind::Gate => Self::Gate,
            ElementKind::InteractionUse => Self::InteractionUse(InteractionUse::default()),
            ElementKind::CombinedFragment(operator) => {
                Self::CombinedFragment(CombinedFragment::new(operator, Vec::new()))
            }
        }
    }

    /// Returns the kind of this element.
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Lifeline => ElementKind::Lifeline,
            Self::Message(message) => ElementKind::Message(message.sort()),
            Self::Occurrence(occurrence) => ElementKind::Occurrence(occurrence.kind()),
            Self::ExecutionSpecification(_) => ElementKind::ExecutionSpecification,
            Self::Gate => ElementKind::Gate,
            Self::InteractionUse(_) => ElementKind::InteractionUse,
            Self::CombinedFragment(fragment) => ElementKind::CombinedFragment(fragment.operator()),
        }
    }

    /// Returns the lifelines this element covers, in model order.
    ///
    /// Messages, gates and lifelines cover nothing.
    pub fn covered(&self) -> Vec<Id> {
        match self {
            Self::Occurrence(occurrence) => occurrence.covered().into_iter().collect(),
            Self::ExecutionSpecification(execution) => execution.covered().into_iter().collect(),
            Self::InteractionUse(interaction_use) => interaction_use.covered().to_vec(),
            Self::CombinedFragment(fragment) => fragment.covered().to_vec(),
            Self::Lifeline | Self::Message(_) | Self::Gate => Vec::new(),
        }
    }

    /// Replaces the covered lifelines of this element.
    ///
    /// Single-lifeline elements take the first entry. Returns false when the
    /// element kind has no covered feature.
    pub fn set_covered(&mut self, covered: &[Id]) -> bool {
        match self {
            Self::Occurrence(occurrence) => occurrence.set_covered(covered.first().copied()),
            Self::ExecutionSpecification(execution) => {
                execution.set_covered(covered.first().copied())
            }
            Self::InteractionUse(interaction_use) => interaction_use.set_covered(covered.to_vec()),
            Self::CombinedFragment(fragment) => fragment.set_covered(covered.to_vec()),
            Self::Lifeline | Self::Message(_) | Self::Gate => return false,
        }
        true
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_message_mut(&mut self) -> Option<&mut Message> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_occurrence(&self) -> Option<&Occurrence> {
        match self {
            Self::Occurrence(occurrence) => Some(occurrence),
            _ => None,
        }
    }

    pub fn as_execution(&self) -> Option<&ExecutionSpecification> {
        match self {
            Self::ExecutionSpecification(execution) => Some(execution),
            _ => None,
        }
    }

    pub fn as_execution_mut(&mut self) -> Option<&mut ExecutionSpecification> {
        match self {
            Self::ExecutionSpecification(execution) => Some(execution),
            _ => None,
        }
    }

    pub fn as_interaction_use(&self) -> Option<&InteractionUse> {
        match self {
            Self::InteractionUse(interaction_use) => Some(interaction_use),
            _ => None,
        }
    }

    pub fn as_interaction_use_mut(&mut self) -> Option<&mut InteractionUse> {
        match self {
            Self::InteractionUse(interaction_use) => Some(interaction_use),
            _ => None,
        }
    }

    pub fn as_combined_fragment(&self) -> Option<&CombinedFragment> {
        match self {
            Self::CombinedFragment(fragment) => Some(fragment),
            _ => None,
        }
    }

    pub fn as_combined_fragment_mut(&mut self) -> Option<&mut CombinedFragment> {
        match self {
            Self::CombinedFragment(fragment) => Some(fragment),
            _ => None,
        }
    }

    pub fn is_gate(&self) -> bool {
        matches!(self, Self::Gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_sort_from_str() {
        assert_eq!("sync".parse::<MessageSort>(), Ok(MessageSort::Synchronous));
        assert_eq!("asynchronous".parse::<MessageSort>(), Ok(MessageSort::Asynchronous));
        assert_eq!("delete".parse::<MessageSort>(), Ok(MessageSort::Delete));
        assert!("sideways".parse::<MessageSort>().is_err());
    }

    #[test]
    fn test_message_sort_display_round_trips() {
        for sort in [
            MessageSort::Synchronous,
            MessageSort::Asynchronous,
            MessageSort::Reply,
            MessageSort::Create,
            MessageSort::Delete,
            MessageSort::Lost,
            MessageSort::Found,
        ] {
            assert_eq!(sort.to_string().parse::<MessageSort>(), Ok(sort));
        }
    }

    #[test]
    fn test_element_new_matches_kind() {
        let kinds = [
            ElementKind::Lifeline,
            ElementKind::Message(MessageSort::Reply),
            ElementKind::Occurrence(OccurrenceKind::Destruction),
            ElementKind::ExecutionSpecification,
            ElementKind::Gate,
            ElementKind::InteractionUse,
            ElementKind::CombinedFragment(InteractionOperator::Loop),
        ];

        for kind in kinds {
            assert_eq!(Element::new(kind).kind(), kind, "Blank element of {kind:?}");
        }
    }

    #[test]
    fn test_covered_round_trip() {
        let a = Id::new("A");
        let b = Id::new("B");

        let mut occurrence = Element::new(ElementKind::Occurrence(OccurrenceKind::Message));
        assert!(occurrence.set_covered(&[a, b]));
        assert_eq!(occurrence.covered(), vec![a], "Occurrences cover a single lifeline");

        let mut interaction_use = Element::new(ElementKind::InteractionUse);
        assert!(interaction_use.set_covered(&[a, b]));
        assert_eq!(interaction_use.covered(), vec![a, b]);

        let mut message = Element::new(ElementKind::Message(MessageSort::Asynchronous));
        assert!(!message.set_covered(&[a]), "Messages have no covered feature");
        assert!(message.covered().is_empty());
    }

    #[test]
    fn test_message_ends() {
        let send = Id::new("send");
        let receive = Id::new("receive");
        let mut message = Message::new(MessageSort::Asynchronous).with_ends(Some(send), None);

        assert_eq!(message.send(), Some(send));
        assert_eq!(message.receive(), None);

        message.set_receive(Some(receive));
        assert_eq!(message.receive(), Some(receive));
    }

    #[test]
    fn test_element_kind_prefix() {
        assert_eq!(ElementKind::Lifeline.prefix(), "Lifeline");
        assert_eq!(
            ElementKind::Occurrence(OccurrenceKind::Destruction).prefix(),
            "Destruction"
        );
        assert_eq!(ElementKind::Occurrence(OccurrenceKind::Execution).prefix(), "Occurrence");
    }
}
