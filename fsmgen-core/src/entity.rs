//! Entity model: states, events, arcs, actions and classes.
//!
//! Every entity carries an [`EntityInfo`] with its identifier, description,
//! source location and the auxiliary fields used by generators. Entities are
//! plain data; references between them are by identifier and are resolved
//! through the owning [`Machine`](crate::Machine).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Identifier reserved for the wildcard ("any state") pseudo-state.
pub const WILDCARD_ID: &str = "#ALL";

/// Where an entity was declared, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::new("<unknown>", 0)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Entity kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Machine,
    State,
    Event,
    Arc,
    Action,
    Class,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Machine => "machine",
            EntityKind::State => "state",
            EntityKind::Event => "event",
            EntityKind::Arc => "arc",
            EntityKind::Action => "action",
            EntityKind::Class => "class",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes shared by every entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityInfo {
    pub id: String,
    pub description: String,
    /// Name of the numeric constant generated for this entity.
    pub enum_id: Option<String>,
    /// Ids of classes whose attributes this entity inherits, in order.
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub location: SourceLocation,
}

impl EntityInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Implements the builder methods common to every entity type.
macro_rules! entity_builders {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $ty {
                pub fn id(&self) -> &str {
                    &self.info.id
                }

                pub fn description(&self) -> &str {
                    &self.info.description
                }

                pub fn location(&self) -> &SourceLocation {
                    &self.info.location
                }

                pub fn with_description(mut self, description: impl Into<String>) -> Self {
                    self.info.description = description.into();
                    self
                }

                pub fn with_enum_id(mut self, enum_id: impl Into<String>) -> Self {
                    self.info.enum_id = Some(enum_id.into());
                    self
                }

                pub fn with_class(mut self, class_id: impl Into<String>) -> Self {
                    self.info.classes.push(class_id.into());
                    self
                }

                pub fn with_attribute(
                    mut self,
                    key: impl Into<String>,
                    value: impl Into<String>,
                ) -> Self {
                    self.info.attributes.insert(key.into(), value.into());
                    self
                }

                pub fn with_location(mut self, location: SourceLocation) -> Self {
                    self.info.location = location;
                    self
                }
            }
        )*
    };
}

entity_builders!(State, Event, Transition, Action, Class);

/// A state of the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub info: EntityInfo,
}

impl State {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            info: EntityInfo::new(id),
        }
    }

    /// The "any state" sentinel.
    pub(crate) fn wildcard() -> Self {
        Self::new(WILDCARD_ID).with_description("any state")
    }

    pub fn is_wildcard(&self) -> bool {
        self.info.id == WILDCARD_ID
    }
}

/// An event that triggers arcs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub info: EntityInfo,
    /// Type tag, compiled as a pattern by the event filter.
    pub event_type: String,
}

impl Event {
    pub fn new(id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            info: EntityInfo::new(id),
            event_type: event_type.into(),
        }
    }
}

/// An arc: a transition between two states on an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub info: EntityInfo,
    pub from: String,
    pub to: String,
    pub event_id: String,
    /// Disambiguates several arcs leaving one state on the same event.
    pub guard: Option<String>,
}

impl Transition {
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        event_id: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            info: EntityInfo::new(id),
            from: from.into(),
            to: to.into(),
            event_id: event_id.into(),
            guard: None,
        }
    }

    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.from == WILDCARD_ID
    }

    /// The (origin, event, guard) slot this arc claims. State and event ids
    /// compare case-insensitively; guards compare exactly.
    pub(crate) fn slot_key(&self) -> (String, String, Option<String>) {
        (
            self.from.to_uppercase(),
            self.event_id.to_uppercase(),
            self.guard.clone(),
        )
    }
}

/// A reusable code fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub info: EntityInfo,
    pub code: String,
}

impl Action {
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            info: EntityInfo::new(id),
            code: code.into(),
        }
    }
}

/// A reusable attribute group inherited by other entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub info: EntityInfo,
}

impl Class {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            info: EntityInfo::new(id),
        }
    }
}

/// Kind-tagged handle to a registered entity.
#[derive(Debug, Clone)]
pub enum Entity {
    State(Arc<State>),
    Event(Arc<Event>),
    Transition(Arc<Transition>),
    Action(Arc<Action>),
    Class(Arc<Class>),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::State(_) => EntityKind::State,
            Entity::Event(_) => EntityKind::Event,
            Entity::Transition(_) => EntityKind::Arc,
            Entity::Action(_) => EntityKind::Action,
            Entity::Class(_) => EntityKind::Class,
        }
    }

    pub fn info(&self) -> &EntityInfo {
        match self {
            Entity::State(s) => &s.info,
            Entity::Event(e) => &e.info,
            Entity::Transition(t) => &t.info,
            Entity::Action(a) => &a.info,
            Entity::Class(c) => &c.info,
        }
    }

    pub fn id(&self) -> &str {
        &self.info().id
    }
}

macro_rules! entity_conversions {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Entity {
                fn from(value: $ty) -> Self {
                    Entity::$variant(Arc::new(value))
                }
            }

            impl From<Arc<$ty>> for Entity {
                fn from(value: Arc<$ty>) -> Self {
                    Entity::$variant(value)
                }
            }
        )*
    };
}

entity_conversions!(
    State => State,
    Event => Event,
    Transition => Transition,
    Action => Action,
    Class => Class,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_fill_info() {
        let state = State::new("IDLE")
            .with_description("waiting")
            .with_enum_id("ST_IDLE")
            .with_class("base")
            .with_attribute("color", "grey")
            .with_location(SourceLocation::new("door.xml", 3));

        assert_eq!(state.id(), "IDLE");
        assert_eq!(state.description(), "waiting");
        assert_eq!(state.info.enum_id.as_deref(), Some("ST_IDLE"));
        assert_eq!(state.info.classes, vec!["base".to_string()]);
        assert_eq!(state.info.attributes.get("color").map(String::as_str), Some("grey"));
        assert_eq!(state.location().to_string(), "door.xml:3");
    }

    #[test]
    fn test_entity_kind_tags() {
        let entities: Vec<Entity> = vec![
            State::new("S").into(),
            Event::new("E", "c").into(),
            Transition::new("A", "S", "E", "S").into(),
            Action::new("X", "do_x();").into(),
            Class::new("K").into(),
        ];
        let kinds: Vec<EntityKind> = entities.iter().map(Entity::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntityKind::State,
                EntityKind::Event,
                EntityKind::Arc,
                EntityKind::Action,
                EntityKind::Class
            ]
        );
        assert_eq!(entities[2].id(), "A");
    }

    #[test]
    fn test_slot_key_includes_guard() {
        let plain = Transition::new("a1", "s", "go", "T");
        let guarded = Transition::new("a2", "S", "GO", "T").with_guard("ready");
        let literal = Transition::new("a3", "S", "GO[ready]", "T");
        assert_eq!(plain.slot_key(), ("S".to_string(), "GO".to_string(), None));
        assert_eq!(
            guarded.slot_key(),
            ("S".to_string(), "GO".to_string(), Some("ready".to_string()))
        );
        assert_ne!(guarded.slot_key(), literal.slot_key());
        assert!(!plain.is_wildcard());
        assert!(Transition::new("a3", WILDCARD_ID, "GO", "T").is_wildcard());
    }
}
