use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, trace};

use weft_core::{
    identifier::Id,
    semantic::{
        CombinedFragment, Element, ElementKind, ExecutionSpecification, InteractionOperator,
        InteractionUse, Message, MessageSort, Occurrence, OccurrenceKind,
    },
};

use super::SemanticModel;
use crate::{
    diff::{Diff, Feature},
    error::WeftError,
};

/// In-memory interaction: the element store plus the interaction's ordered
/// collections.
///
/// # Examples
///
/// ```
/// # use weft::model::{Interaction, SemanticModel};
/// # use weft_core::{identifier::Id, semantic::MessageSort};
/// let mut model = Interaction::new(Id::new("doc_checkout"));
/// let client = model.add_lifeline(Id::new("doc_client"));
/// let server = model.add_lifeline(Id::new("doc_server"));
/// model.add_message(MessageSort::Asynchronous, Some(client), Some(server));
///
/// assert_eq!(model.lifelines().len(), 2);
/// assert_eq!(model.fragments().len(), 2, "send and receive occurrences");
/// ```
#[derive(Debug, Clone)]
pub struct Interaction {
    id: Id,
    lifelines: Vec<Id>,
    messages: Vec<Id>,
    fragments: Vec<Id>,
    formal_gates: Vec<Id>,
    elements: IndexMap<Id, Element>,
    next_index: usize,
}

impl Interaction {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            lifelines: Vec::new(),
            messages: Vec::new(),
            fragments: Vec::new(),
            formal_gates: Vec::new(),
            elements: IndexMap::new(),
            next_index: 1,
        }
    }

    /// Number of elements in the store, detached ones included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: Id) -> bool {
        self.elements.contains_key(&id)
    }

    /// Stores `element` under `id` without adding it to any collection.
    pub fn insert_element(&mut self, id: Id, element: Element) {
        self.elements.insert(id, element);
    }

    fn generate_id(&mut self, kind: ElementKind) -> Id {
        loop {
            let name = format!("{}{}", kind.prefix(), self.next_index);
            self.next_index += 1;
            let id = self.id.create_nested(Id::new(&name));
            if !self.elements.contains_key(&id) && id != self.id {
                return id;
            }
        }
    }

    // =========================================================================
    // Construction helpers
    // =========================================================================

    pub fn add_lifeline(&mut self, id: Id) -> Id {
        self.elements.insert(id, Element::Lifeline);
        self.lifelines.push(id);
        id
    }

    pub fn add_formal_gate(&mut self) -> Id {
        let id = self.generate_id(ElementKind::Gate);
        self.elements.insert(id, Element::Gate);
        self.formal_gates.push(id);
        id
    }

    /// Appends an occurrence on `lifeline` to the interaction's fragments.
    pub fn add_occurrence(&mut self, kind: OccurrenceKind, lifeline: Id) -> Id {
        let id = self.generate_id(ElementKind::Occurrence(kind));
        self.elements
            .insert(id, Element::Occurrence(Occurrence::new(kind, Some(lifeline))));
        self.fragments.push(id);
        id
    }

    /// Adds a message with the given, already stored, ends.
    pub fn add_message_with_ends(
        &mut self,
        sort: MessageSort,
        send: Option<Id>,
        receive: Option<Id>,
    ) -> Id {
        let id = self.generate_id(ElementKind::Message(sort));
        self.elements
            .insert(id, Element::Message(Message::new(sort).with_ends(send, receive)));
        self.messages.push(id);
        id
    }

    /// Adds a message between two lifelines, appending a send and a receive
    /// occurrence. A missing lifeline leaves that end unset, which makes a
    /// lost or found message. The receive end of a delete message is a
    /// destruction.
    pub fn add_message(&mut self, sort: MessageSort, from: Option<Id>, to: Option<Id>) -> Id {
        let send = from.map(|lifeline| self.add_occurrence(OccurrenceKind::Message, lifeline));
        let receive_kind = match sort {
            MessageSort::Delete => OccurrenceKind::Destruction,
            _ => OccurrenceKind::Message,
        };
        let receive = to.map(|lifeline| self.add_occurrence(receive_kind, lifeline));
        self.add_message_with_ends(sort, send, receive)
    }

    /// Adds an execution specification between two stored occurrences of
    /// one lifeline, placed right after `start` in the fragment list.
    pub fn add_execution(&mut self, start: Id, finish: Id) -> Id {
        let covered = self
            .elements
            .get(&start)
            .and_then(Element::as_occurrence)
            .and_then(Occurrence::covered);
        let id = self.generate_id(ElementKind::ExecutionSpecification);
        self.elements.insert(
            id,
            Element::ExecutionSpecification(ExecutionSpecification::new(
                covered,
                Some(start),
                Some(finish),
            )),
        );
        let index = self
            .fragments
            .iter()
            .position(|fragment| *fragment == start)
            .map_or(self.fragments.len(), |index| index + 1);
        self.fragments.insert(index, id);
        id
    }

    /// Appends an interaction use covering `covered`.
    pub fn add_interaction_use(&mut self, covered: Vec<Id>) -> Id {
        let id = self.generate_id(ElementKind::InteractionUse);
        self.elements
            .insert(id, Element::InteractionUse(InteractionUse::new(covered)));
        self.fragments.push(id);
        id
    }

    /// Adds an actual gate to an interaction use.
    pub fn add_actual_gate(&mut self, interaction_use: Id) -> Option<Id> {
        let id = self.generate_id(ElementKind::Gate);
        let owner = self
            .elements
            .get_mut(&interaction_use)
            .and_then(Element::as_interaction_use_mut)?;
        let mut gates = owner.gates().to_vec();
        gates.push(id);
        owner.set_gates(gates);
        self.elements.insert(id, Element::Gate);
        Some(id)
    }

    /// Wraps the top-level fragments `enclosed` in a combined fragment placed
    /// where the first of them was.
    pub fn add_combined_fragment(
        &mut self,
        operator: InteractionOperator,
        covered: Vec<Id>,
        enclosed: Vec<Id>,
    ) -> Id {
        let id = self.generate_id(ElementKind::CombinedFragment(operator));
        let index = self
            .fragments
            .iter()
            .position(|fragment| enclosed.contains(fragment))
            .unwrap_or(self.fragments.len());
        self.fragments.retain(|fragment| !enclosed.contains(fragment));
        let mut fragment = CombinedFragment::new(operator, covered);
        fragment.set_fragments(enclosed);
        self.elements.insert(id, Element::CombinedFragment(fragment));
        self.fragments.insert(index.min(self.fragments.len()), id);
        id
    }

    // =========================================================================
    // Applying differences
    // =========================================================================

    /// Applies `diffs` in order.
    ///
    /// Every entry is validated first; nothing changes when one is invalid.
    /// Elements that no collection reaches afterwards are dropped.
    pub fn apply(&mut self, diffs: &[Diff]) -> Result<(), WeftError> {
        for diff in diffs {
            self.validate(diff)?;
        }

        let mut next = self.clone();
        for diff in diffs {
            trace!(diff:% = diff; "Apply difference");
            next.apply_one(diff)?;
        }
        next.collect_garbage();
        *self = next;
        debug!(count = diffs.len(); "Applied differences");
        Ok(())
    }

    fn validate(&self, diff: &Diff) -> Result<(), WeftError> {
        let owner = diff.owner();
        let feature = diff.feature();
        if self.values(owner, feature).is_none() {
            return Err(WeftError::Model(format!(
                "`{owner}` has no feature `{feature}`"
            )));
        }
        let referenced: Vec<Id> = match diff {
            Diff::Create { element, .. } | Diff::Delete { element, .. } => vec![*element],
            Diff::ChangeFeature { new, .. } => new.clone(),
        };
        if let Some(missing) = referenced.iter().find(|id| !self.contains(**id)) {
            return Err(WeftError::Model(format!(
                "difference on `{owner}.{feature}` references unknown element `{missing}`"
            )));
        }
        Ok(())
    }

    fn apply_one(&mut self, diff: &Diff) -> Result<(), WeftError> {
        let owner = diff.owner();
        let feature = diff.feature();
        let mut values = self.values(owner, feature).ok_or_else(|| {
            WeftError::Model(format!("`{owner}` has no feature `{feature}`"))
        })?;
        match diff {
            Diff::Create { element, index, .. } => {
                if !values.contains(element) {
                    values.insert((*index).min(values.len()), *element);
                }
            }
            Diff::Delete { element, .. } => values.retain(|value| value != element),
            Diff::ChangeFeature { new, .. } => values = new.clone(),
        }
        self.set_values(owner, feature, values);
        Ok(())
    }

    /// Current value of a feature; single references are zero or one ids.
    fn values(&self, owner: Id, feature: Feature) -> Option<Vec<Id>> {
        if owner == self.id {
            return match feature {
                Feature::Lifelines => Some(self.lifelines.clone()),
                Feature::Fragments => Some(self.fragments.clone()),
                Feature::Messages => Some(self.messages.clone()),
                Feature::FormalGates => Some(self.formal_gates.clone()),
                _ => None,
            };
        }
        let element = self.elements.get(&owner)?;
        match (feature, element) {
            (Feature::Covered, Element::Lifeline | Element::Message(_) | Element::Gate) => None,
            (Feature::Covered, element) => Some(element.covered()),
            (Feature::Fragments, Element::CombinedFragment(fragment)) => {
                Some(fragment.fragments().to_vec())
            }
            (Feature::ActualGates, Element::InteractionUse(interaction_use)) => {
                Some(interaction_use.gates().to_vec())
            }
            (Feature::SendEvent, Element::Message(message)) => {
                Some(message.send().into_iter().collect())
            }
            (Feature::ReceiveEvent, Element::Message(message)) => {
                Some(message.receive().into_iter().collect())
            }
            (Feature::Start, Element::ExecutionSpecification(execution)) => {
                Some(execution.start().into_iter().collect())
            }
            (Feature::Finish, Element::ExecutionSpecification(execution)) => {
                Some(execution.finish().into_iter().collect())
            }
            _ => None,
        }
    }

    fn set_values(&mut self, owner: Id, feature: Feature, values: Vec<Id>) {
        if owner == self.id {
            match feature {
                Feature::Lifelines => self.lifelines = values,
                Feature::Fragments => self.fragments = values,
                Feature::Messages => self.messages = values,
                Feature::FormalGates => self.formal_gates = values,
                _ => {}
            }
            return;
        }
        let Some(element) = self.elements.get_mut(&owner) else {
            return;
        };
        let first = values.first().copied();
        match (feature, element) {
            (Feature::Covered, element) => {
                element.set_covered(&values);
            }
            (Feature::Fragments, Element::CombinedFragment(fragment)) => {
                fragment.set_fragments(values)
            }
            (Feature::ActualGates, Element::InteractionUse(interaction_use)) => {
                interaction_use.set_gates(values)
            }
            (Feature::SendEvent, Element::Message(message)) => message.set_send(first),
            (Feature::ReceiveEvent, Element::Message(message)) => message.set_receive(first),
            (Feature::Start, Element::ExecutionSpecification(execution)) => {
                execution.set_start(first)
            }
            (Feature::Finish, Element::ExecutionSpecification(execution)) => {
                execution.set_finish(first)
            }
            _ => {}
        }
    }

    /// Drops every element the interaction's collections no longer reach.
    fn collect_garbage(&mut self) {
        let mut reachable: HashSet<Id> = HashSet::new();
        let mut pending: Vec<Id> = self
            .lifelines
            .iter()
            .chain(&self.messages)
            .chain(&self.fragments)
            .chain(&self.formal_gates)
            .copied()
            .collect();

        while let Some(id) = pending.pop() {
            if !reachable.insert(id) {
                continue;
            }
            match self.elements.get(&id) {
                Some(Element::Message(message)) => {
                    pending.extend(message.send().into_iter().chain(message.receive()))
                }
                Some(Element::ExecutionSpecification(execution)) => {
                    pending.extend(execution.start().into_iter().chain(execution.finish()))
                }
                Some(Element::InteractionUse(interaction_use)) => {
                    pending.extend(interaction_use.gates().iter().copied())
                }
                Some(Element::CombinedFragment(fragment)) => {
                    pending.extend(fragment.fragments().iter().copied())
                }
                _ => {}
            }
        }

        let before = self.elements.len();
        self.elements.retain(|id, _| reachable.contains(id));
        let dropped = before - self.elements.len();
        if dropped > 0 {
            debug!(dropped = dropped; "Dropped unreachable elements");
        }
    }
}

impl SemanticModel for Interaction {
    fn interaction(&self) -> Id {
        self.id
    }

    fn lifelines(&self) -> &[Id] {
        &self.lifelines
    }

    fn messages(&self) -> &[Id] {
        &self.messages
    }

    fn fragments(&self) -> &[Id] {
        &self.fragments
    }

    fn formal_gates(&self) -> &[Id] {
        &self.formal_gates
    }

    fn element(&self, id: Id) -> Option<&Element> {
        self.elements.get(&id)
    }

    fn element_mut(&mut self, id: Id) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    fn create_element(&mut self, kind: ElementKind, owner: Id) -> Id {
        let id = self.generate_id(kind);
        trace!(element:% = id, owner:% = owner; "Create detached element");
        self.elements.insert(id, Element::new(kind));
        id
    }
}
