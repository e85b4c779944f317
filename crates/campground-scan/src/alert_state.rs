use std::collections::HashSet;

use crate::config::AlertPolicy;

/// Spot names that have already produced an alert during this run.
#[derive(Debug, Default)]
pub struct AlertedSet {
    policy: AlertPolicy,
    names: HashSet<String>,
}

impl AlertedSet {
    /// Empty set governed by `policy`.
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            policy,
            names: HashSet::new(),
        }
    }

    /// Record an alert attempt. Returns `false` if `name` was already alerted.
    pub fn mark_alerted(&mut self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }

    /// Whether `name` has been alerted.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// A poll saw `name` unavailable. Only `Rearm` forgets it.
    pub fn observe_closed(&mut self, name: &str) -> bool {
        match self.policy {
            AlertPolicy::Once => false,
            AlertPolicy::Rearm => self.names.remove(name),
        }
    }

    /// Number of alerted names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True before the first alert.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
