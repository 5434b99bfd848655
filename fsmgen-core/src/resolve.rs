//! Per-event arc resolution with wildcard expansion.
//!
//! An arc leaving `#ALL` stands for one arc per concrete state. Expansion
//! instantiates it for every state that has no explicit arc claiming the same
//! (event, guard) slot; explicit arcs always win. A wildcard arc whose
//! destination is also `#ALL` becomes a self-loop on each state.

use crate::entity::{EntityInfo, Event, State, Transition, WILDCARD_ID};
use crate::error::SoftWarning;
use crate::machine::Machine;
use std::collections::HashMap;
use std::sync::Arc;

/// Whether wildcard arcs are expanded per concrete state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expansion {
    /// Arcs exactly as declared, wildcard arcs included.
    Raw,
    /// Wildcard arcs replaced by derived per-state arcs.
    #[default]
    Expanded,
}

impl Machine {
    /// Arcs that fire on `event`, ordered by the ordinal of their origin.
    ///
    /// In expanded mode there is at most one arc per concrete state and
    /// guard. Arcs whose endpoints do not resolve are skipped with a soft
    /// warning.
    pub fn arcs_for_event(&self, event: &Event, expansion: Expansion) -> Vec<Arc<Transition>> {
        let event_id = event.id().to_uppercase();
        let mut claimed: HashMap<(String, Option<String>), Arc<Transition>> = HashMap::new();
        let mut explicit = Vec::new();
        let mut wildcards = Vec::new();

        for arc in self.arcs() {
            if arc.event_id.to_uppercase() != event_id {
                continue;
            }
            // First declaration of a slot wins; later ones are validation defects.
            let key = (arc.from.to_uppercase(), arc.guard.clone());
            if claimed.contains_key(&key) {
                continue;
            }
            claimed.insert(key, Arc::clone(arc));
            if arc.is_wildcard() {
                wildcards.push(Arc::clone(arc));
            } else {
                explicit.push(Arc::clone(arc));
            }
        }

        let mut resolved = explicit;
        match expansion {
            Expansion::Raw => resolved.extend(wildcards),
            Expansion::Expanded => {
                let states = self.states();
                for wildcard in &wildcards {
                    for state in &states {
                        let key = (state.id().to_uppercase(), wildcard.guard.clone());
                        if let Some(owner) = claimed.get(&key) {
                            if owner.from != state.id() {
                                self.warn(SoftWarning::WildcardShadowed {
                                    arc: wildcard.id().to_string(),
                                    state: state.id().to_string(),
                                    claimed_by: owner.id().to_string(),
                                });
                            }
                            continue;
                        }
                        resolved.push(Arc::new(derive_arc(wildcard, state)));
                    }
                }
            }
        }

        let numbering = self.numbering();
        let mut ordered: Vec<(i64, Arc<Transition>)> = Vec::with_capacity(resolved.len());
        for arc in resolved {
            let Some(number) = self.resolve_endpoints(&arc).and_then(|_| numbering.get(&arc.from))
            else {
                continue;
            };
            ordered.push((number, arc));
        }
        ordered.sort_by_key(|(number, _)| *number);
        ordered.into_iter().map(|(_, arc)| arc).collect()
    }

    /// Checks both endpoints resolve to states, warning on the first that
    /// does not.
    fn resolve_endpoints(&self, arc: &Transition) -> Option<()> {
        for endpoint in [&arc.from, &arc.to] {
            if !matches!(self.state_by_id(endpoint), Ok(Some(_))) {
                self.warn(SoftWarning::UnresolvedState {
                    arc: arc.id().to_string(),
                    state: endpoint.clone(),
                });
                return None;
            }
        }
        Some(())
    }
}

/// Instantiates a wildcard arc for one concrete state.
fn derive_arc(wildcard: &Transition, state: &State) -> Transition {
    let to = if wildcard.to == WILDCARD_ID {
        state.id().to_string()
    } else {
        wildcard.to.clone()
    };

    Transition {
        info: EntityInfo {
            id: format!("{}_{}", wildcard.id(), state.id()),
            description: wildcard.info.description.clone(),
            enum_id: None,
            classes: wildcard.info.classes.clone(),
            attributes: wildcard.info.attributes.clone(),
            location: wildcard.info.location.clone(),
        },
        from: state.id().to_string(),
        to,
        event_id: wildcard.event_id.clone(),
        guard: wildcard.guard.clone(),
    }
}
