//! Derives a filtered machine for one generation target.

use crate::config::Config;
use crate::entity::{Entity, EntityKind, State, Transition};
use crate::error::{MachineError, SoftWarning};
use crate::filter::EventFilter;
use crate::machine::Machine;
use crate::resolve::Expansion;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

impl Machine {
    /// Builds a new machine holding only the events selected by
    /// `specifiers`, their expanded arcs, and the states those arcs touch.
    ///
    /// States, events, actions and classes are shared with `self`; arcs
    /// derived from wildcard arcs are new entities owned by the result.
    /// Empty event, arc or state sets are recorded as soft warnings on the
    /// returned machine, as is any derived arc whose id is already taken;
    /// such arcs are left out.
    pub fn extract_output_machine<I, S>(&self, specifiers: I) -> Result<Machine, MachineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let specifiers: Vec<String> = specifiers
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        let events = self.matching_events(&specifiers);

        let mut output = Machine::new(self.id())
            .with_description(self.description())
            .with_location(self.location().clone())
            .with_preamble(self.preamble())
            .with_postamble(self.postamble())
            .with_modes(self.modes().iter().cloned())
            .with_autogenerated_message(self.autogenerated_message())?;

        let mut taken: HashMap<String, Arc<Transition>> = HashMap::new();
        let mut arcs = Vec::new();
        for event in &events {
            for arc in self.arcs_for_event(event, Expansion::Expanded) {
                if let Some(existing) = self.collision(&arc) {
                    output.warn(SoftWarning::DerivedArcCollision {
                        arc: arc.id().to_string(),
                        existing,
                    });
                    continue;
                }
                match taken.get(arc.id()) {
                    // Events differing only in case select the same arcs.
                    Some(previous) if same_arc(previous, &arc) => {}
                    Some(_) => output.warn(SoftWarning::DerivedArcCollision {
                        arc: arc.id().to_string(),
                        existing: EntityKind::Arc,
                    }),
                    None => {
                        taken.insert(arc.id().to_string(), Arc::clone(&arc));
                        arcs.push(arc);
                    }
                }
            }
        }

        let numbering = self.numbering();
        let mut seen_states = HashSet::new();
        let mut states: Vec<Arc<State>> = Vec::new();
        for arc in &arcs {
            for state in [self.from_state(arc), self.to_state(arc)].into_iter().flatten() {
                if !state.is_wildcard() && seen_states.insert(state.id().to_string()) {
                    states.push(state);
                }
            }
        }
        states.sort_by_key(|state| numbering.get(state.id()).unwrap_or(i64::MAX));

        if events.is_empty() {
            output.warn(SoftWarning::EmptyEvents {
                specifiers: EventFilter::new(&specifiers).specifiers(),
            });
        }
        if arcs.is_empty() {
            output.warn(SoftWarning::EmptyArcs);
        }
        if states.is_empty() {
            output.warn(SoftWarning::EmptyStates);
        }

        tracing::debug!(
            machine = %self.id(),
            events = events.len(),
            arcs = arcs.len(),
            states = states.len(),
            "extracted output machine"
        );

        output.add(events.into_iter().map(Entity::Event))?;
        output.add(states.into_iter().map(Entity::State))?;
        output.add(arcs.into_iter().map(Entity::Transition))?;
        output.add(self.actions().iter().cloned().map(Entity::Action))?;
        output.add(self.classes().iter().cloned().map(Entity::Class))?;

        Ok(output)
    }

    /// Extracts the machine for a target configured in `config`.
    pub fn extract_for_target(&self, config: &Config, target: &str) -> Result<Machine, MachineError> {
        let specifiers = config
            .specifiers_for(target)
            .ok_or_else(|| MachineError::UnknownTarget {
                target: target.to_string(),
            })?;
        self.extract_output_machine(specifiers)
    }

    /// Kind of the entity a derived arc's id would shadow, if any. Arcs
    /// registered on this machine never collide with themselves.
    fn collision(&self, arc: &Arc<Transition>) -> Option<EntityKind> {
        if arc.id() == self.id() {
            return Some(EntityKind::Machine);
        }
        match self.lookup(arc.id(), None) {
            Ok(Some(Entity::Transition(registered))) if Arc::ptr_eq(registered, arc) => None,
            Ok(Some(entity)) => Some(entity.kind()),
            _ => None,
        }
    }
}

fn same_arc(a: &Transition, b: &Transition) -> bool {
    a.from == b.from && a.to == b.to && a.event_id == b.event_id && a.guard == b.guard
}
