//! # fsmgen-core
//!
//! In-memory model and semantic analysis for state machine descriptions.
//!
//! This crate provides:
//! - Entity model and a flat, cross-kind identifier registry
//! - The machine container with derived state numbering
//! - Graph validation with aggregated diagnostics
//! - Per-event arc resolution with `#ALL` wildcard expansion
//! - Event filtering by type specifiers and output machine extraction
//!
//! It does not execute machines; generators consume the query surface of
//! [`Machine`] to emit code or diagrams.

pub mod config;
pub mod document;
pub mod entity;
pub mod error;
pub mod extract;
pub mod filter;
pub mod machine;
pub mod numbering;
pub mod registry;
pub mod resolve;
pub mod validate;

pub use config::{Config, ConfigError, TargetConfig};
pub use document::MachineDocument;
pub use entity::{
    Action, Class, Entity, EntityInfo, EntityKind, Event, SourceLocation, State, Transition,
    WILDCARD_ID,
};
pub use error::{Defect, Diagnostic, MachineError, SoftWarning, ValidationError};
pub use filter::{EventFilter, TypeSpecifier};
pub use machine::Machine;
pub use numbering::{NumberedState, WILDCARD_ORDINAL};
pub use resolve::Expansion;
