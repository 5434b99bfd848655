//! Serialized machine documents.
//!
//! The parsing front end hands over one record per declared entity. Records
//! can be read from JSON or YAML:
//!
//! ```json
//! {
//!   "id": "door",
//!   "states": [{"id": "OPEN"}, {"id": "CLOSED", "classes": "quiet base"}],
//!   "events": [{"id": "push", "type": "c|py"}],
//!   "arcs": [
//!     {"id": "close", "from": "OPEN", "event": "push", "to": "CLOSED"},
//!     {"id": "stay", "from": "#ALL", "event": "push", "to": "#ALL", "guard": "jammed"}
//!   ]
//! }
//! ```
//!
//! Missing arc endpoints and event ids load as empty strings so that
//! [`Machine::assert_valid`] can report them together with every other
//! defect.

use crate::entity::{
    Action, Class, Entity, EntityInfo, Event, SourceLocation, State, Transition, WILDCARD_ID,
};
use crate::error::MachineError;
use crate::machine::Machine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields common to every entity record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_id: Option<String>,

    /// Inherited classes: a list, or one string of ids separated by
    /// whitespace or commas.
    #[serde(
        default,
        deserialize_with = "deserialize_class_refs",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub classes: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl EntityRecord {
    fn into_info(self, fallback: &SourceLocation) -> EntityInfo {
        EntityInfo {
            id: self.id,
            description: self.description,
            enum_id: self.enum_id,
            classes: self.classes,
            attributes: self.attributes,
            location: self.location.unwrap_or_else(|| fallback.clone()),
        }
    }

    fn from_info(info: &EntityInfo) -> Self {
        Self {
            id: info.id.clone(),
            description: info.description.clone(),
            enum_id: info.enum_id.clone(),
            classes: info.classes.clone(),
            attributes: info.attributes.clone(),
            location: Some(info.location.clone()),
        }
    }
}

fn deserialize_class_refs<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct ClassRefsVisitor;

    impl<'de> Visitor<'de> for ClassRefsVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or array of class ids")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.split(|c: char| c.is_whitespace() || c == ',')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect())
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut classes = Vec::new();
            while let Some(s) = seq.next_element::<String>()? {
                classes.push(s);
            }
            Ok(classes)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(ClassRefsVisitor)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    #[serde(flatten)]
    pub entity: EntityRecord,
}

fn default_event_type() -> String {
    WILDCARD_ID.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(flatten)]
    pub entity: EntityRecord,

    /// Type pattern; untyped events match every target.
    #[serde(rename = "type", default = "default_event_type")]
    pub event_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcRecord {
    #[serde(flatten)]
    pub entity: EntityRecord,

    #[serde(default)]
    pub from: String,

    #[serde(default)]
    pub to: String,

    #[serde(default)]
    pub event: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(flatten)]
    pub entity: EntityRecord,

    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    #[serde(flatten)]
    pub entity: EntityRecord,
}

/// A whole machine as produced by the parsing front end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineDocument {
    pub id: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,

    #[serde(default)]
    pub preamble: String,

    #[serde(default)]
    pub postamble: String,

    #[serde(default)]
    pub modes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autogenerated_message: Option<String>,

    #[serde(default)]
    pub states: Vec<StateRecord>,

    #[serde(default)]
    pub events: Vec<EventRecord>,

    #[serde(default)]
    pub arcs: Vec<ArcRecord>,

    #[serde(default)]
    pub actions: Vec<ActionRecord>,

    #[serde(default)]
    pub classes: Vec<ClassRecord>,
}

impl MachineDocument {
    pub fn from_json_value(json: &serde_json::Value) -> Result<Self, MachineError> {
        Ok(serde_json::from_value(json.clone())?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, MachineError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, MachineError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, MachineError> {
        Ok(serde_json::to_value(self)?)
    }

    /// CRC32C of the document's JSON form, as 8 hex digits.
    pub fn checksum(&self) -> Result<String, MachineError> {
        let json_bytes = serde_json::to_vec(self)?;
        Ok(format!("{:08x}", crc32c::crc32c(&json_bytes)))
    }

    /// Builds a machine, registering every record through [`Machine::add`].
    ///
    /// Fails on id collisions and unsafe autogenerated messages. Dangling
    /// references are left for [`Machine::assert_valid`].
    pub fn into_machine(self) -> Result<Machine, MachineError> {
        if self.id.is_empty() {
            return Err(MachineError::InvalidDocument {
                reason: "machine id is empty".to_string(),
            });
        }
        if let Some(kind) = self.unnamed_records().next() {
            return Err(MachineError::InvalidDocument {
                reason: format!("{} record without an id", kind),
            });
        }

        let location = self.location.clone().unwrap_or_default();
        let mut machine = Machine::new(self.id)
            .with_description(self.description)
            .with_location(location.clone())
            .with_preamble(self.preamble)
            .with_postamble(self.postamble)
            .with_modes(self.modes);
        if let Some(message) = self.autogenerated_message {
            machine = machine.with_autogenerated_message(message)?;
        }

        machine.add(self.states.into_iter().map(|r| {
            Entity::from(State {
                info: r.entity.into_info(&location),
            })
        }))?;
        machine.add(self.events.into_iter().map(|r| {
            Entity::from(Event {
                info: r.entity.into_info(&location),
                event_type: r.event_type,
            })
        }))?;
        machine.add(self.arcs.into_iter().map(|r| {
            Entity::from(Transition {
                info: r.entity.into_info(&location),
                from: r.from,
                to: r.to,
                event_id: r.event,
                guard: r.guard,
            })
        }))?;
        machine.add(self.actions.into_iter().map(|r| {
            Entity::from(Action {
                info: r.entity.into_info(&location),
                code: r.code,
            })
        }))?;
        machine.add(self.classes.into_iter().map(|r| {
            Entity::from(Class {
                info: r.entity.into_info(&location),
            })
        }))?;

        Ok(machine)
    }

    /// Kind name of each record that has an empty id.
    fn unnamed_records(&self) -> impl Iterator<Item = &'static str> + '_ {
        let records = self
            .states
            .iter()
            .map(|r| ("state", &r.entity.id))
            .chain(self.events.iter().map(|r| ("event", &r.entity.id)))
            .chain(self.arcs.iter().map(|r| ("arc", &r.entity.id)))
            .chain(self.actions.iter().map(|r| ("action", &r.entity.id)))
            .chain(self.classes.iter().map(|r| ("class", &r.entity.id)));
        records
            .filter(|(_, id)| id.is_empty())
            .map(|(kind, _)| kind)
    }

    /// Exports a machine back into document form.
    pub fn from_machine(machine: &Machine) -> Self {
        Self {
            id: machine.id().to_string(),
            description: machine.description().to_string(),
            location: Some(machine.location().clone()),
            preamble: machine.preamble().to_string(),
            postamble: machine.postamble().to_string(),
            modes: machine.modes().to_vec(),
            autogenerated_message: Some(machine.autogenerated_message().to_string()),
            states: machine
                .states()
                .iter()
                .map(|s| StateRecord {
                    entity: EntityRecord::from_info(&s.info),
                })
                .collect(),
            events: machine
                .events()
                .iter()
                .map(|e| EventRecord {
                    entity: EntityRecord::from_info(&e.info),
                    event_type: e.event_type.clone(),
                })
                .collect(),
            arcs: machine
                .arcs()
                .iter()
                .map(|a| ArcRecord {
                    entity: EntityRecord::from_info(&a.info),
                    from: a.from.clone(),
                    to: a.to.clone(),
                    event: a.event_id.clone(),
                    guard: a.guard.clone(),
                })
                .collect(),
            actions: machine
                .actions()
                .iter()
                .map(|a| ActionRecord {
                    entity: EntityRecord::from_info(&a.info),
                    code: a.code.clone(),
                })
                .collect(),
            classes: machine
                .classes()
                .iter()
                .map(|c| ClassRecord {
                    entity: EntityRecord::from_info(&c.info),
                })
                .collect(),
        }
    }
}
