//! Event selection by type specifiers.
//!
//! Each event's declared `type` is compiled as a case-insensitive,
//! whole-string pattern and tested against the caller's specifier strings,
//! not the other way round. An event type of `c|cpp` therefore matches the
//! specifiers `c` and `CPP`, and a type of `.*` matches every specifier.
//!
//! A specifier prefixed with `!` excludes events whose pattern matches it.
//! Events whose pattern matches `#ALL` or `#ANY` are always selected.

use crate::entity::Event;
use crate::error::SoftWarning;
use crate::machine::Machine;
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::Arc;

/// Marker that turns a specifier into an exclusion.
pub const EXCLUDE_PREFIX: char = '!';

/// Candidate strings that select an event regardless of the specifiers.
const UNIVERSAL_TYPES: [&str; 2] = ["#ALL", "#ANY"];

/// One parsed type specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpecifier {
    Include(String),
    Exclude(String),
}

impl TypeSpecifier {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.strip_prefix(EXCLUDE_PREFIX) {
            Some(tag) => TypeSpecifier::Exclude(tag.trim().to_string()),
            None => TypeSpecifier::Include(s.to_string()),
        }
    }
}

impl fmt::Display for TypeSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpecifier::Include(tag) => f.write_str(tag),
            TypeSpecifier::Exclude(tag) => write!(f, "{}{}", EXCLUDE_PREFIX, tag),
        }
    }
}

impl From<&str> for TypeSpecifier {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// A parsed list of specifiers, split into inclusions and exclusions.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl EventFilter {
    pub fn new<I, S>(specifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        for specifier in specifiers {
            match TypeSpecifier::parse(specifier.as_ref()) {
                TypeSpecifier::Include(tag) => filter.include.push(tag),
                TypeSpecifier::Exclude(tag) => filter.exclude.push(tag),
            }
        }
        filter
    }

    /// Applies the filter to one compiled event type.
    pub fn accepts(&self, pattern: &Regex) -> bool {
        if UNIVERSAL_TYPES.iter().any(|t| pattern.is_match(t)) {
            return true;
        }
        let included =
            self.include.is_empty() || self.include.iter().any(|tag| pattern.is_match(tag));
        included && !self.exclude.iter().any(|tag| pattern.is_match(tag))
    }

    pub fn specifiers(&self) -> Vec<String> {
        self.include
            .iter()
            .cloned()
            .map(TypeSpecifier::Include)
            .chain(self.exclude.iter().cloned().map(TypeSpecifier::Exclude))
            .map(|s| s.to_string())
            .collect()
    }
}

/// Compiles an event type as an anchored, case-insensitive pattern.
///
/// The type must parse on its own before it is wrapped, so unbalanced
/// groups cannot escape the anchors.
pub fn compile_type(event_type: &str) -> Result<Regex, regex::Error> {
    Regex::new(event_type)?;
    RegexBuilder::new(&format!("^(?:{})$", event_type))
        .case_insensitive(true)
        .build()
}

impl Machine {
    /// Events selected by `specifiers`, in declaration order.
    ///
    /// No specifiers selects every event. A list of only exclusions selects
    /// every event not excluded.
    pub fn matching_events<I, S>(&self, specifiers: I) -> Vec<Arc<Event>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let filter = EventFilter::new(specifiers);
        self.events()
            .iter()
            .filter(|event| {
                self.event_pattern(event)
                    .is_some_and(|pattern| filter.accepts(&pattern))
            })
            .cloned()
            .collect()
    }

    /// Compiles an event's type, falling back to a literal match when the
    /// type is not a valid pattern.
    fn event_pattern(&self, event: &Event) -> Option<Regex> {
        match compile_type(&event.event_type) {
            Ok(pattern) => Some(pattern),
            Err(_) => {
                self.warn(SoftWarning::InvalidTypePattern {
                    event: event.id().to_string(),
                    pattern: event.event_type.clone(),
                });
                compile_type(&regex::escape(&event.event_type)).ok()
            }
        }
    }
}
