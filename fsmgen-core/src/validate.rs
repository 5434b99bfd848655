//! Graph consistency checks.

use crate::entity::EntityKind;
use crate::error::{Defect, Diagnostic, SoftWarning, ValidationError};
use crate::machine::Machine;
use std::collections::HashMap;

impl Machine {
    /// Sweeps every arc for dangling references and duplicate
    /// (state, event, guard) claims.
    ///
    /// All defects are collected before failing, so the error lists every
    /// problem in the machine. Duplicate `enum_id`s are reported as soft
    /// warnings and never fail validation.
    pub fn assert_valid(&self) -> Result<(), ValidationError> {
        let mut diagnostics = Vec::new();
        // (from, event, guard) -> first arc claiming it
        let mut claimed: HashMap<(String, String, Option<String>), String> = HashMap::new();

        for arc in self.arcs() {
            let mut report = |defect| {
                diagnostics.push(Diagnostic {
                    arc: arc.id().to_string(),
                    location: arc.location().clone(),
                    defect,
                })
            };

            if arc.from.is_empty() {
                report(Defect::MissingFrom);
            } else if !self.is_state(&arc.from) {
                report(Defect::UnknownFrom(arc.from.clone()));
            }

            if arc.to.is_empty() {
                report(Defect::MissingTo);
            } else if !self.is_state(&arc.to) {
                report(Defect::UnknownTo(arc.to.clone()));
            }

            if arc.event_id.is_empty() {
                report(Defect::MissingEvent);
            } else if !matches!(self.event_by_id(&arc.event_id), Ok(Some(_))) {
                report(Defect::UnknownEvent(arc.event_id.clone()));
            }

            let slot = arc.slot_key();
            if let Some(first) = claimed.get(&slot) {
                report(Defect::DuplicateArc {
                    from: arc.from.clone(),
                    event: arc.event_id.clone(),
                    guard: arc.guard.clone(),
                    first: first.clone(),
                });
            } else {
                claimed.insert(slot, arc.id().to_string());
            }
        }

        self.check_enum_ids();

        if diagnostics.is_empty() {
            tracing::debug!(machine = %self.id(), arcs = self.arcs().len(), "machine is valid");
            Ok(())
        } else {
            Err(ValidationError { diagnostics })
        }
    }

    fn is_state(&self, id: &str) -> bool {
        matches!(self.lookup(id, None), Ok(Some(entity)) if entity.kind() == EntityKind::State)
    }

    /// Reports every registered entity whose `enum_id` repeats an earlier one.
    fn check_enum_ids(&self) {
        let mut entities: Vec<_> = self
            .registry()
            .iter()
            .filter(|entity| entity.info().enum_id.is_some())
            .collect();
        // Registry iteration order is unspecified; sort for stable reports.
        entities.sort_by(|a, b| a.id().cmp(b.id()));

        let mut seen: HashMap<&str, &str> = HashMap::new();
        for entity in entities {
            let Some(enum_id) = entity.info().enum_id.as_deref() else {
                continue;
            };
            match seen.get(enum_id) {
                Some(first) => self.warn(SoftWarning::DuplicateEnumId {
                    enum_id: enum_id.to_string(),
                    first: first.to_string(),
                    second: entity.id().to_string(),
                }),
                None => {
                    seen.insert(enum_id, entity.id());
                }
            }
        }
    }
}
