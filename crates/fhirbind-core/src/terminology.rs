//! Terminology membership capability.
//!
//! Membership checks are consumed as an injected capability. Implementations
//! may front a terminology server or a local database; the core only sees a
//! synchronous membership answer. Lookup failure is not distinguished from
//! non-membership by the core — callers wanting that distinction must make
//! it inside the injected capability.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::BindingStrength;

/// Errors surfaced by a terminology capability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TerminologyError {
    /// The capability could not answer, e.g. a backing service outage.
    #[error("terminology service unavailable: {message}")]
    Unavailable {
        /// What went wrong.
        message: String,
    },
}

impl TerminologyError {
    /// Create an unavailability error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Capability answering "is this code a member of this value set".
pub trait TerminologyProvider: Send + Sync {
    /// Whether `code` (optionally qualified by `system`) is a member of the
    /// value set, checked under the given binding strength.
    fn is_member(
        &self,
        code: &str,
        system: Option<&str>,
        value_set: &str,
        strength: BindingStrength,
    ) -> Result<bool, TerminologyError>;
}

/// In-memory terminology provider for tests and embedded use.
///
/// Codes registered without a system match lookups with any system.
#[derive(Debug, Default)]
pub struct InMemoryTerminology {
    sets: HashMap<String, HashSet<(Option<String>, String)>>,
}

impl InMemoryTerminology {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a code in a value set.
    pub fn add_code(&mut self, value_set: impl Into<String>, system: Option<&str>, code: impl Into<String>) {
        self.sets
            .entry(value_set.into())
            .or_default()
            .insert((system.map(str::to_string), code.into()));
    }
}

impl TerminologyProvider for InMemoryTerminology {
    fn is_member(
        &self,
        code: &str,
        system: Option<&str>,
        value_set: &str,
        _strength: BindingStrength,
    ) -> Result<bool, TerminologyError> {
        let Some(members) = self.sets.get(value_set) else {
            return Ok(false);
        };
        let member = members.contains(&(system.map(str::to_string), code.to_string()))
            || members.contains(&(None, code.to_string()));
        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_by_system_and_code() {
        let mut terminology = InMemoryTerminology::new();
        terminology.add_code("http://example.org/vs/status", Some("http://example.org/cs"), "final");
        terminology.add_code("http://example.org/vs/status", None, "amended");

        let check = |code: &str, system: Option<&str>| {
            terminology
                .is_member(code, system, "http://example.org/vs/status", BindingStrength::Required)
                .unwrap()
        };

        assert!(check("final", Some("http://example.org/cs")));
        assert!(!check("final", Some("http://other.org/cs")));
        // System-less registrations match any lookup.
        assert!(check("amended", Some("http://example.org/cs")));
        assert!(check("amended", None));
        assert!(!check("draft", None));
    }

    #[test]
    fn unknown_value_set_is_not_membership() {
        let terminology = InMemoryTerminology::new();
        let member = terminology
            .is_member("final", None, "http://example.org/vs/missing", BindingStrength::Required)
            .unwrap();
        assert!(!member);
    }
}
