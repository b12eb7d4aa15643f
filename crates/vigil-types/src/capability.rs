//! Backend capability probing.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A feature a backend may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Signal delivery.
    Signals,
    /// Workflow update delivery.
    Updates,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Signals => "signals",
            Capability::Updates => "updates",
        };
        f.write_str(name)
    }
}

/// Set of capabilities a backend reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    supported: BTreeSet<Capability>,
}

impl Capabilities {
    /// No capabilities.
    pub fn none() -> Self {
        Self {
            supported: BTreeSet::new(),
        }
    }

    /// Every known capability.
    pub fn all() -> Self {
        [Capability::Signals, Capability::Updates]
            .into_iter()
            .collect()
    }

    /// Whether `capability` is supported.
    pub fn supports(&self, capability: Capability) -> bool {
        self.supported.contains(&capability)
    }

    /// Add a capability.
    pub fn with(mut self, capability: Capability) -> Self {
        self.supported.insert(capability);
        self
    }

    /// Remove a capability.
    pub fn without(mut self, capability: Capability) -> Self {
        self.supported.remove(&capability);
        self
    }

    /// Iterate supported capabilities.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.supported.iter().copied()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            supported: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_supports_updates() {
        assert!(Capabilities::all().supports(Capability::Updates));
        assert!(!Capabilities::none().supports(Capability::Updates));
    }

    #[test]
    fn test_without() {
        let caps = Capabilities::all().without(Capability::Updates);
        assert!(!caps.supports(Capability::Updates));
        assert!(caps.supports(Capability::Signals));
        assert_eq!(caps.iter().count(), 1);
    }
}
