//! Vector clocks backing the version tokens of [`crate::MemoryKv`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One written version: the actor that wrote it and that actor's counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dot {
    pub actor: String,
    pub counter: u64,
}

impl Dot {
    pub fn new(actor: impl Into<String>, counter: u64) -> Self {
        Self {
            actor: actor.into(),
            counter,
        }
    }
}

/// Maps actors to the highest counter observed from each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VClock {
    entries: HashMap<String, u64>,
}

impl VClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter for an actor (0 if never seen).
    pub fn get(&self, actor: &str) -> u64 {
        self.entries.get(actor).copied().unwrap_or(0)
    }

    /// Record that `dot` has been seen.
    pub fn observe(&mut self, dot: &Dot) {
        let counter = self.entries.entry(dot.actor.clone()).or_insert(0);
        *counter = (*counter).max(dot.counter);
    }

    /// Element-wise max.
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.entries.clone();
        for (k, &v) in &other.entries {
            let entry = merged.entry(k.clone()).or_insert(0);
            *entry = (*entry).max(v);
        }
        Self { entries: merged }
    }

    /// Whether the version named by `dot` happened before this clock.
    pub fn covers(&self, dot: &Dot) -> bool {
        self.get(&dot.actor) >= dot.counter
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<&'a Dot> for VClock {
    fn from_iter<I: IntoIterator<Item = &'a Dot>>(iter: I) -> Self {
        let mut clock = VClock::new();
        for dot in iter {
            clock.observe(dot);
        }
        clock
    }
}
