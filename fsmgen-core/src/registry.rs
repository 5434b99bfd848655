//! Flat identifier namespace shared by every entity kind of one machine.

use crate::entity::{Entity, EntityKind};
use crate::error::MachineError;
use std::collections::HashMap;

/// Maps identifiers to kind-tagged entity handles.
///
/// Ids are unique across all kinds: a state and an event may not share an
/// id, and no entity may reuse the owning machine's id.
#[derive(Debug, Clone)]
pub struct Registry {
    machine_id: String,
    entries: HashMap<String, Entity>,
}

impl Registry {
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            entries: HashMap::new(),
        }
    }

    /// Creates a registry with `reserved` already present, bypassing the
    /// machine-id check.
    pub(crate) fn with_reserved(machine_id: impl Into<String>, reserved: Entity) -> Self {
        let mut registry = Self::new(machine_id);
        registry.entries.insert(reserved.id().to_string(), reserved);
        registry
    }

    /// Reserves the entity's id.
    pub fn register(&mut self, entity: Entity) -> Result<(), MachineError> {
        let id = entity.id();
        if id == self.machine_id {
            return Err(MachineError::DuplicateIdentifier {
                id: id.to_string(),
                existing: EntityKind::Machine,
                incoming: entity.kind(),
            });
        }
        if let Some(existing) = self.entries.get(id) {
            return Err(MachineError::DuplicateIdentifier {
                id: id.to_string(),
                existing: existing.kind(),
                incoming: entity.kind(),
            });
        }

        self.entries.insert(id.to_string(), entity);
        Ok(())
    }

    /// Looks up an id, optionally requiring a specific kind.
    pub fn lookup(
        &self,
        id: &str,
        kind: Option<EntityKind>,
    ) -> Result<Option<&Entity>, MachineError> {
        let Some(entity) = self.entries.get(id) else {
            return Ok(None);
        };

        match kind {
            Some(expected) if expected != entity.kind() => Err(MachineError::KindMismatch {
                id: id.to_string(),
                expected,
                found: entity.kind(),
            }),
            _ => Ok(Some(entity)),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Class, Event, State};

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new("door");
        registry.register(State::new("OPEN").into()).unwrap();
        registry.register(Event::new("push", "c").into()).unwrap();

        let found = registry.lookup("OPEN", None).unwrap().unwrap();
        assert_eq!(found.kind(), EntityKind::State);
        assert!(registry.lookup("CLOSED", None).unwrap().is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_across_kinds_rejected() {
        let mut registry = Registry::new("door");
        registry.register(State::new("OPEN").into()).unwrap();

        let err = registry.register(Class::new("OPEN").into()).unwrap_err();
        match err {
            MachineError::DuplicateIdentifier {
                id,
                existing,
                incoming,
            } => {
                assert_eq!(id, "OPEN");
                assert_eq!(existing, EntityKind::State);
                assert_eq!(incoming, EntityKind::Class);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_machine_id_reserved() {
        let mut registry = Registry::new("door");
        let err = registry.register(Event::new("door", "c").into()).unwrap_err();
        assert!(matches!(
            err,
            MachineError::DuplicateIdentifier {
                existing: EntityKind::Machine,
                ..
            }
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_kind_mismatch() {
        let mut registry = Registry::new("door");
        registry.register(Event::new("push", "c").into()).unwrap();

        let err = registry.lookup("push", Some(EntityKind::State)).unwrap_err();
        assert!(matches!(
            err,
            MachineError::KindMismatch {
                expected: EntityKind::State,
                found: EntityKind::Event,
                ..
            }
        ));
        assert!(registry
            .lookup("push", Some(EntityKind::Event))
            .unwrap()
            .is_some());
    }
}
