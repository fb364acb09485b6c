//! Native binding bridge
//!
//! Keeps a per-slot count of how many of the host's own bindings use each
//! key, so owners cannot claim a single key the host already reacts to.

use std::collections::HashMap;

use crate::keymap::{KeyCode, MAX_KEY};

/// One of the host's own key bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeBinding {
    pub label: String,
    pub keys: Vec<KeyCode>,
}

impl NativeBinding {
    pub fn new(label: impl Into<String>, keys: impl IntoIterator<Item = KeyCode>) -> Self {
        Self {
            label: label.into(),
            keys: keys.into_iter().collect(),
        }
    }
}

/// Usage counters for native bindings, indexed by key slot.
#[derive(Debug, Clone)]
pub struct NativeBindings {
    counters: Vec<u32>,
    tracked: HashMap<String, Vec<usize>>,
}

impl Default for NativeBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeBindings {
    pub fn new() -> Self {
        Self {
            counters: vec![0; MAX_KEY as usize],
            tracked: HashMap::new(),
        }
    }

    /// Start counting `binding`'s keys. Adding a label twice is a no-op.
    ///
    /// Key code 0 means "unbound" and is skipped.
    pub fn add(&mut self, binding: &NativeBinding) -> bool {
        if self.tracked.contains_key(&binding.label) {
            return false;
        }
        let slots: Vec<usize> = binding
            .keys
            .iter()
            .filter(|key| key.code() != 0)
            .map(|key| key.slot())
            .collect();
        for &slot in &slots {
            self.counters[slot] += 1;
        }
        tracing::trace!("Tracking native binding {} on slots {:?}", binding.label, slots);
        self.tracked.insert(binding.label.clone(), slots);
        true
    }

    /// Stop counting the binding with `label`. Unknown labels are a no-op.
    pub fn remove(&mut self, label: &str) -> bool {
        let Some(slots) = self.tracked.remove(label) else {
            return false;
        };
        for slot in slots {
            self.counters[slot] = self.counters[slot].saturating_sub(1);
        }
        true
    }

    /// Rebuild from scratch: forget every tracked binding, then add the catalog.
    pub fn refresh<I>(&mut self, catalog: I)
    where
        I: IntoIterator<Item = NativeBinding>,
    {
        self.counters.iter_mut().for_each(|c| *c = 0);
        self.tracked.clear();
        for binding in catalog {
            self.add(&binding);
        }
        tracing::debug!("Native binding catalog refreshed: {} binding(s)", self.tracked.len());
    }

    /// Number of native bindings using the key slot `slot`.
    pub fn usage(&self, slot: usize) -> u32 {
        self.counters.get(slot).copied().unwrap_or(0)
    }

    /// Labels of the tracked bindings using `slot`, sorted.
    pub fn labels_for(&self, slot: usize) -> Vec<String> {
        let mut labels: Vec<String> = self
            .tracked
            .iter()
            .filter(|(_, slots)| slots.contains(&slot))
            .map(|(label, _)| label.clone())
            .collect();
        labels.sort();
        labels
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}
