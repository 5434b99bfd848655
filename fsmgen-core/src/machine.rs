//! The machine container: owns every entity collection and the registry.

use crate::entity::{
    Action, Class, Entity, EntityInfo, EntityKind, Event, SourceLocation, State, Transition,
    WILDCARD_ID,
};
use crate::error::{MachineError, SoftWarning};
use crate::numbering::{NumberedState, Numbering};
use crate::registry::Registry;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, LazyLock};

/// Message stamped into generated files unless overridden.
pub const DEFAULT_AUTOGENERATED_MESSAGE: &str = "Autogenerated file - do not edit!";

static SAFE_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w :./\\!,\-]*$").expect("valid safe-message pattern")
});

/// Returns true if `message` only uses characters allowed in the
/// autogenerated-file warning.
pub fn is_safe_message(message: &str) -> bool {
    SAFE_MESSAGE.is_match(message)
}

/// A state machine description.
///
/// Entities are registered once through [`Machine::add`] and never removed.
/// The wildcard state `#ALL` is owned by the machine, reserved in the
/// registry, and only appears in [`Machine::raw_states`].
#[derive(Debug)]
pub struct Machine {
    id: String,
    description: String,
    location: SourceLocation,
    preamble: String,
    postamble: String,
    modes: Vec<String>,
    autogenerated_message: String,

    wildcard: Arc<State>,
    states: Vec<Arc<State>>,
    events: Vec<Arc<Event>>,
    arcs: Vec<Arc<Transition>>,
    actions: Vec<Arc<Action>>,
    classes: Vec<Arc<Class>>,
    registry: Registry,

    /// Soft warnings reported by queries on this machine.
    warnings: Mutex<Vec<SoftWarning>>,
}

impl Machine {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let wildcard = Arc::new(State::wildcard());
        let registry = Registry::with_reserved(id.clone(), Entity::State(Arc::clone(&wildcard)));

        Self {
            id,
            description: String::new(),
            location: SourceLocation::default(),
            preamble: String::new(),
            postamble: String::new(),
            modes: Vec::new(),
            autogenerated_message: DEFAULT_AUTOGENERATED_MESSAGE.to_string(),
            wildcard,
            states: Vec::new(),
            events: Vec::new(),
            arcs: Vec::new(),
            actions: Vec::new(),
            classes: Vec::new(),
            registry,
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    pub fn with_postamble(mut self, postamble: impl Into<String>) -> Self {
        self.postamble = postamble.into();
        self
    }

    pub fn with_modes<I, S>(mut self, modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modes = modes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the autogenerated-file warning. Rejects control characters and
    /// anything outside word characters, space and `:./\!,-`.
    pub fn with_autogenerated_message(
        mut self,
        message: impl Into<String>,
    ) -> Result<Self, MachineError> {
        let message = message.into();
        if !is_safe_message(&message) {
            return Err(MachineError::UnsafeMessage { message });
        }
        self.autogenerated_message = message;
        Ok(self)
    }

    /// Registers each entity and appends it to the collection of its kind.
    ///
    /// Stops at the first id collision; entities before it stay registered.
    pub fn add<I>(&mut self, entities: I) -> Result<(), MachineError>
    where
        I: IntoIterator,
        I::Item: Into<Entity>,
    {
        for entity in entities {
            let entity = entity.into();
            self.registry.register(entity.clone())?;
            tracing::debug!(machine = %self.id, kind = %entity.kind(), id = entity.id(), "registered");

            match entity {
                Entity::State(state) => self.states.push(state),
                Entity::Event(event) => self.events.push(event),
                Entity::Transition(arc) => self.arcs.push(arc),
                Entity::Action(action) => self.actions.push(action),
                Entity::Class(class) => self.classes.push(class),
            }
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn postamble(&self) -> &str {
        &self.postamble
    }

    pub fn modes(&self) -> &[String] {
        &self.modes
    }

    pub fn autogenerated_message(&self) -> &str {
        &self.autogenerated_message
    }

    pub fn wildcard(&self) -> &Arc<State> {
        &self.wildcard
    }

    pub fn is_wildcard(&self, id: &str) -> bool {
        id == WILDCARD_ID
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Numbers the current concrete states.
    pub fn numbering(&self) -> Numbering {
        Numbering::compute(&self.states)
    }

    /// Concrete states sorted by ordinal, wildcard excluded.
    pub fn states(&self) -> Vec<NumberedState> {
        let mut states = self.numbering().number(&self.states);
        states.sort_by_key(|s| s.number);
        states
    }

    /// Concrete states plus the wildcard, which sorts first at -1.
    pub fn raw_states(&self) -> Vec<NumberedState> {
        let numbering = self.numbering();
        let mut states = numbering.number(&self.states);
        states.push(NumberedState {
            number: crate::numbering::WILDCARD_ORDINAL,
            state: Arc::clone(&self.wildcard),
        });
        states.sort_by_key(|s| s.number);
        states
    }

    /// Current ordinal of a state id, -1 for the wildcard.
    pub fn ordinal(&self, state_id: &str) -> Option<i64> {
        self.numbering().get(state_id)
    }

    pub fn events(&self) -> &[Arc<Event>] {
        &self.events
    }

    pub fn arcs(&self) -> &[Arc<Transition>] {
        &self.arcs
    }

    pub fn actions(&self) -> &[Arc<Action>] {
        &self.actions
    }

    pub fn classes(&self) -> &[Arc<Class>] {
        &self.classes
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Untyped lookup across every kind.
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.registry.lookup(id, None).ok().flatten()
    }

    /// Looks up an id, failing with `KindMismatch` if `kind` is given and
    /// the entity found is of another kind.
    pub fn lookup(&self, id: &str, kind: Option<EntityKind>) -> Result<Option<&Entity>, MachineError> {
        self.registry.lookup(id, kind)
    }

    pub fn state_by_id(&self, id: &str) -> Result<Option<Arc<State>>, MachineError> {
        Ok(match self.lookup(id, Some(EntityKind::State))? {
            Some(Entity::State(state)) => Some(Arc::clone(state)),
            _ => None,
        })
    }

    pub fn event_by_id(&self, id: &str) -> Result<Option<Arc<Event>>, MachineError> {
        Ok(match self.lookup(id, Some(EntityKind::Event))? {
            Some(Entity::Event(event)) => Some(Arc::clone(event)),
            _ => None,
        })
    }

    pub fn arc_by_id(&self, id: &str) -> Result<Option<Arc<Transition>>, MachineError> {
        Ok(match self.lookup(id, Some(EntityKind::Arc))? {
            Some(Entity::Transition(arc)) => Some(Arc::clone(arc)),
            _ => None,
        })
    }

    pub fn action_by_id(&self, id: &str) -> Result<Option<Arc<Action>>, MachineError> {
        Ok(match self.lookup(id, Some(EntityKind::Action))? {
            Some(Entity::Action(action)) => Some(Arc::clone(action)),
            _ => None,
        })
    }

    pub fn class_by_id(&self, id: &str) -> Result<Option<Arc<Class>>, MachineError> {
        Ok(match self.lookup(id, Some(EntityKind::Class))? {
            Some(Entity::Class(class)) => Some(Arc::clone(class)),
            _ => None,
        })
    }

    /// Resolves an arc's origin. Ids of another kind resolve to `None`.
    pub fn from_state(&self, arc: &Transition) -> Option<Arc<State>> {
        self.state_by_id(&arc.from).ok().flatten()
    }

    /// Resolves an arc's destination. Ids of another kind resolve to `None`.
    pub fn to_state(&self, arc: &Transition) -> Option<Arc<State>> {
        self.state_by_id(&arc.to).ok().flatten()
    }

    /// Attributes of an entity after class inheritance: each referenced
    /// class in order, then the entity's own attributes on top. Classes
    /// inherit from their own classes the same way; a class already on the
    /// inheritance path is not entered twice.
    pub fn resolved_attributes(&self, info: &EntityInfo) -> BTreeMap<String, String> {
        let mut resolved = BTreeMap::new();
        let mut visited = HashSet::new();
        self.inherit(info, &mut visited, &mut resolved);
        resolved
    }

    fn inherit(
        &self,
        info: &EntityInfo,
        visited: &mut HashSet<String>,
        resolved: &mut BTreeMap<String, String>,
    ) {
        for class_id in &info.classes {
            match self.class_by_id(class_id) {
                Ok(Some(class)) => {
                    if !visited.insert(class_id.clone()) {
                        tracing::warn!(
                            "{} '{}' inherits class '{}' cyclically",
                            info.location,
                            info.id,
                            class_id
                        );
                        continue;
                    }
                    self.inherit(&class.info, visited, resolved);
                    visited.remove(class_id);
                }
                _ => {
                    tracing::warn!(
                        "{} '{}' inherits unknown class '{}'",
                        info.location,
                        info.id,
                        class_id
                    );
                }
            }
        }
        for (key, value) in &info.attributes {
            resolved.insert(key.clone(), value.clone());
        }
    }

    // =========================================================================
    // Soft warnings
    // =========================================================================

    /// Logs a soft warning and records it on this machine.
    pub(crate) fn warn(&self, warning: SoftWarning) {
        tracing::warn!(machine = %self.id, "{}", warning);
        self.warnings.lock().push(warning);
    }

    /// Soft warnings recorded so far.
    pub fn warnings(&self) -> Vec<SoftWarning> {
        self.warnings.lock().clone()
    }

    /// Drains the recorded soft warnings.
    pub fn take_warnings(&self) -> Vec<SoftWarning> {
        std::mem::take(&mut *self.warnings.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn door() -> Machine {
        let mut machine = Machine::new("door").with_description("a door");
        machine
            .add(vec![
                Entity::from(State::new("OPEN")),
                State::new("CLOSED").into(),
                State::new("LOCKED").into(),
                Event::new("push", "c").into(),
                Transition::new("a1", "OPEN", "push", "CLOSED").into(),
                Action::new("beep", "beep();").into(),
                Class::new("base").with_attribute("color", "grey").into(),
            ])
            .unwrap();
        machine
    }

    #[test]
    fn test_add_routes_by_kind() {
        let machine = door();
        assert_eq!(machine.states().len(), 3);
        assert_eq!(machine.events().len(), 1);
        assert_eq!(machine.arcs().len(), 1);
        assert_eq!(machine.actions().len(), 1);
        assert_eq!(machine.classes().len(), 1);
        assert_eq!(machine.description(), "a door");
    }

    #[test]
    fn test_states_exclude_wildcard() {
        let machine = door();
        let states = machine.states();
        let raw = machine.raw_states();

        assert!(states.iter().all(|s| !s.is_wildcard()));
        assert_eq!(raw.len(), states.len() + 1);
        assert_eq!(raw[0].id(), WILDCARD_ID);
        assert_eq!(raw[0].number, -1);
        let numbers: Vec<i64> = states.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_numbering_follows_membership() {
        let mut machine = door();
        assert_eq!(machine.ordinal("LOCKED"), Some(3));
        machine.add([State::new("BROKEN")]).unwrap();
        assert_eq!(machine.ordinal("BROKEN"), Some(4));
        assert_eq!(machine.states().last().map(|s| s.number), Some(4));
        assert_eq!(machine.ordinal(WILDCARD_ID), Some(-1));
    }

    #[test]
    fn test_duplicate_identifier() {
        let mut machine = door();
        let err = machine.add([Event::new("OPEN", "c")]).unwrap_err();
        assert!(matches!(err, MachineError::DuplicateIdentifier { .. }));

        let err = machine.add([Class::new("door")]).unwrap_err();
        assert!(matches!(
            err,
            MachineError::DuplicateIdentifier {
                existing: EntityKind::Machine,
                ..
            }
        ));

        let err = machine.add([State::new(WILDCARD_ID)]).unwrap_err();
        assert!(matches!(err, MachineError::DuplicateIdentifier { .. }));
    }

    #[test]
    fn test_typed_lookups() {
        let machine = door();
        assert!(machine.state_by_id("OPEN").unwrap().is_some());
        assert!(machine.state_by_id("AJAR").unwrap().is_none());
        assert!(machine.state_by_id(WILDCARD_ID).unwrap().is_some());
        assert!(machine.event_by_id("push").unwrap().is_some());
        assert!(machine.arc_by_id("a1").unwrap().is_some());
        assert!(machine.action_by_id("beep").unwrap().is_some());
        assert!(machine.class_by_id("base").unwrap().is_some());
        assert!(matches!(
            machine.state_by_id("push"),
            Err(MachineError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_arc_endpoints_resolve_lazily() {
        let machine = door();
        let arc = machine.arc_by_id("a1").unwrap().unwrap();
        assert_eq!(machine.from_state(&arc).unwrap().id(), "OPEN");
        assert_eq!(machine.to_state(&arc).unwrap().id(), "CLOSED");
    }

    #[test]
    fn test_resolved_attributes() {
        let mut machine = door();
        machine
            .add([Class::new("alarm")
                .with_attribute("color", "red")
                .with_attribute("sound", "loud")])
            .unwrap();
        let state = State::new("AJAR")
            .with_class("base")
            .with_class("alarm")
            .with_class("missing")
            .with_attribute("sound", "soft");

        let attributes = machine.resolved_attributes(&state.info);
        assert_eq!(attributes.get("color").map(String::as_str), Some("red"));
        assert_eq!(attributes.get("sound").map(String::as_str), Some("soft"));
    }

    #[test]
    fn test_resolved_attributes_follow_class_chain() {
        let mut machine = door();
        machine
            .add(vec![
                Entity::from(Class::new("root").with_attribute("shape", "round")),
                Class::new("quiet")
                    .with_class("root")
                    .with_attribute("sound", "none")
                    .into(),
                Class::new("loop_a").with_class("loop_b").into(),
                Class::new("loop_b")
                    .with_class("loop_a")
                    .with_attribute("depth", "1")
                    .into(),
            ])
            .unwrap();

        let state = State::new("HUSHED").with_class("quiet");
        let attributes = machine.resolved_attributes(&state.info);
        assert_eq!(attributes.get("shape").map(String::as_str), Some("round"));
        assert_eq!(attributes.get("sound").map(String::as_str), Some("none"));

        let state = State::new("SPIN").with_class("loop_a");
        let attributes = machine.resolved_attributes(&state.info);
        assert_eq!(attributes.get("depth").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_autogenerated_message_charset() {
        let machine = Machine::new("door")
            .with_autogenerated_message("Generated by fsmgen: C:\\out/door.c, do not edit!")
            .unwrap();
        assert!(machine.autogenerated_message().starts_with("Generated"));

        let err = Machine::new("door")
            .with_autogenerated_message("bad\nmessage")
            .unwrap_err();
        assert!(matches!(err, MachineError::UnsafeMessage { .. }));
        assert!(!is_safe_message("*/ injected /*"));
        assert!(is_safe_message(DEFAULT_AUTOGENERATED_MESSAGE));
    }
}
