//! Combination registry
//!
//! Maps every chord hash to the combination that claimed it. A hash has at
//! most one owner, and a single-key hash cannot be claimed while a native
//! binding uses that key.

use std::collections::HashMap;

use crate::chord::is_single;
use crate::combination::{ComboId, Combination};
use crate::error::{Collision, RegistrationError};
use crate::keymap::KeyCode;
use crate::native::NativeBindings;

/// What to do with the non-colliding chords of a registration that collides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistrationPolicy {
    /// Claim every free chord even though the call reports `Taken`.
    #[default]
    Compatible,
    /// Claim nothing unless every chord is free.
    Atomic,
}

#[derive(Debug, Default)]
pub struct Registry {
    combos: HashMap<ComboId, Combination>,
    by_hash: HashMap<i64, ComboId>,
    native: NativeBindings,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `combination` and hand out its id. Its chords are not claimed yet.
    pub(crate) fn store(&mut self, combination: Combination) -> ComboId {
        let id = ComboId(self.next_id);
        self.next_id += 1;
        self.combos.insert(id, combination);
        id
    }

    /// Forget the combination entirely, releasing any chords it still holds.
    pub(crate) fn discard(&mut self, id: ComboId) -> Option<Combination> {
        self.release(id);
        self.combos.remove(&id)
    }

    /// Claim the chords of a stored combination.
    pub(crate) fn claim(
        &mut self,
        id: ComboId,
        policy: RegistrationPolicy,
    ) -> Result<(), RegistrationError> {
        let hashes = match self.combos.get(&id) {
            Some(combo) => combo.hashes()?.to_vec(),
            None => return Err(RegistrationError::InvalidCombination),
        };

        // Check and insert one chord at a time, so a combination listing the
        // same chord twice collides with itself.
        let mut taken = Vec::new();
        let mut inserted = Vec::new();
        for hash in hashes {
            if self.is_taken(hash) {
                taken.push(hash);
            } else {
                self.by_hash.insert(hash, id);
                inserted.push(hash);
            }
        }

        if taken.is_empty() {
            return Ok(());
        }

        let collisions = self.collisions_for(&taken);
        let kept = match policy {
            RegistrationPolicy::Compatible if !inserted.is_empty() => Some(id),
            RegistrationPolicy::Compatible => None,
            RegistrationPolicy::Atomic => {
                for hash in inserted {
                    self.by_hash.remove(&hash);
                }
                None
            }
        };
        Err(RegistrationError::Taken { collisions, kept })
    }

    /// Drop every hash still pointing at `id`.
    pub(crate) fn release(&mut self, id: ComboId) {
        let hashes = match self.combos.get(&id).map(Combination::hashes) {
            Some(Ok(hashes)) => hashes.to_vec(),
            _ => return,
        };
        for hash in hashes {
            if self.by_hash.get(&hash) == Some(&id) {
                self.by_hash.remove(&hash);
            }
        }
    }

    /// Whether `hash` is claimed or blocked by a native binding.
    pub fn is_taken(&self, hash: i64) -> bool {
        self.by_hash.contains_key(&hash) || self.native_usage(hash) > 0
    }

    fn native_usage(&self, hash: i64) -> u32 {
        if is_single(hash) && hash >= 0 {
            self.native.usage(hash as usize)
        } else {
            0
        }
    }

    /// Everything standing in the way of claiming `hashes`.
    pub fn collisions_for(&self, hashes: &[i64]) -> Vec<Collision> {
        let mut collisions = Vec::new();
        for &hash in hashes {
            if let Some(combo) = self.lookup(hash) {
                collisions.push(Collision::Combination {
                    label: combo.label(),
                });
            }
            if self.native_usage(hash) > 0 {
                collisions.push(Collision::Native {
                    key: KeyCode(hash as u16),
                    bindings: self.native.labels_for(hash as usize),
                });
            }
        }
        collisions
    }

    pub fn lookup_id(&self, hash: i64) -> Option<ComboId> {
        self.by_hash.get(&hash).copied()
    }

    pub fn lookup(&self, hash: i64) -> Option<&Combination> {
        self.lookup_id(hash).and_then(|id| self.combos.get(&id))
    }

    pub fn get(&self, id: ComboId) -> Option<&Combination> {
        self.combos.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ComboId> + '_ {
        self.combos.keys().copied()
    }

    /// Number of claimed hashes.
    pub fn claimed(&self) -> usize {
        self.by_hash.len()
    }

    pub fn native(&self) -> &NativeBindings {
        &self.native
    }

    pub(crate) fn native_mut(&mut self) -> &mut NativeBindings {
        &mut self.native
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::NativeBinding;

    fn combo(owner: &str, chords: &[&[u16]]) -> Combination {
        Combination::new(
            owner,
            "action",
            chords
                .iter()
                .map(|c| c.iter().copied().map(KeyCode).collect())
                .collect(),
        )
    }

    fn register(registry: &mut Registry, c: Combination) -> (ComboId, Result<(), RegistrationError>) {
        let id = registry.store(c);
        let result = registry.claim(id, RegistrationPolicy::Compatible);
        (id, result)
    }

    #[test]
    fn test_claim_and_lookup() {
        let mut registry = Registry::new();
        let (id, result) = register(&mut registry, combo("a", &[&[29, 30], &[59]]));
        assert_eq!(result, Ok(()));
        assert_eq!(registry.lookup_id(29 * 350 + 30), Some(id));
        assert_eq!(registry.lookup_id(59), Some(id));
        assert_eq!(registry.claimed(), 2);
    }

    #[test]
    fn test_reordered_chord_collides() {
        let mut registry = Registry::new();
        let (_, first) = register(&mut registry, combo("a", &[&[29, 30]]));
        let (_, second) = register(&mut registry, combo("b", &[&[30, 29]]));
        assert_eq!(first, Ok(()));
        assert_eq!(
            second,
            Err(RegistrationError::Taken {
                collisions: vec![Collision::Combination { label: "a.action".into() }],
                kept: None,
            })
        );
    }

    #[test]
    fn test_compatible_policy_keeps_free_chords() {
        let mut registry = Registry::new();
        let (a, _) = register(&mut registry, combo("a", &[&[30]]));
        let (b, result) = register(&mut registry, combo("b", &[&[30], &[31]]));
        assert!(matches!(
            result,
            Err(RegistrationError::Taken { kept: Some(kept), .. }) if kept == b
        ));
        assert_eq!(registry.lookup_id(30), Some(a));
        assert_eq!(registry.lookup_id(31), Some(b));
    }

    #[test]
    fn test_atomic_policy_claims_nothing_on_collision() {
        let mut registry = Registry::new();
        let (a, _) = register(&mut registry, combo("a", &[&[30]]));
        let b = registry.store(combo("b", &[&[30], &[31]]));
        let result = registry.claim(b, RegistrationPolicy::Atomic);
        assert!(matches!(result, Err(RegistrationError::Taken { kept: None, .. })));
        assert_eq!(registry.lookup_id(30), Some(a));
        assert_eq!(registry.lookup_id(31), None);
    }

    #[test]
    fn test_native_binding_blocks_single_key_only() {
        let mut registry = Registry::new();
        registry.native_mut().add(&NativeBinding::new("jump", [KeyCode(57)]));

        let (_, single) = register(&mut registry, combo("a", &[&[57]]));
        assert_eq!(
            single,
            Err(RegistrationError::Taken {
                collisions: vec![Collision::Native {
                    key: KeyCode(57),
                    bindings: vec!["jump".into()],
                }],
                kept: None,
            })
        );

        let (_, chord) = register(&mut registry, combo("b", &[&[29, 57]]));
        assert_eq!(chord, Ok(()));
    }

    #[test]
    fn test_release_is_idempotent_and_scoped() {
        let mut registry = Registry::new();
        let (a, _) = register(&mut registry, combo("a", &[&[30]]));
        let (b, _) = register(&mut registry, combo("b", &[&[30], &[31]]));

        // b never owned 30, releasing it must not free a's claim
        registry.release(b);
        registry.release(b);
        assert_eq!(registry.lookup_id(30), Some(a));
        assert_eq!(registry.lookup_id(31), None);

        registry.discard(a);
        assert_eq!(registry.lookup_id(30), None);
        assert!(registry.get(a).is_none());
    }

    #[test]
    fn test_invalid_combination_claims_nothing() {
        let mut registry = Registry::new();
        let (_, result) = register(&mut registry, combo("a", &[&[]]));
        assert_eq!(result, Err(RegistrationError::InvalidCombination));
        assert_eq!(registry.claimed(), 0);
    }

    #[test]
    fn test_collisions_for_reports_both_sources() {
        let mut registry = Registry::new();
        let (_, result) = register(&mut registry, combo("a", &[&[30]]));
        assert_eq!(result, Ok(()));
        registry.native_mut().add(&NativeBinding::new("attack", [KeyCode(30)]));

        let collisions = registry.collisions_for(&[30, 31]);
        assert_eq!(collisions.len(), 2);
        assert_eq!(collisions[0].to_string(), "a.action");
        assert_eq!(collisions[1].to_string(), "native.attack");
    }

    #[test]
    fn test_repeated_chord_collides_with_itself() {
        let mut registry = Registry::new();
        let (id, result) = register(&mut registry, combo("a", &[&[29, 30], &[30, 29]]));
        assert_eq!(
            result,
            Err(RegistrationError::Taken {
                collisions: vec![Collision::Combination { label: "a.action".into() }],
                kept: Some(id),
            })
        );
        assert_eq!(registry.lookup_id(29 * 350 + 30), Some(id));

        let (b, result) = register(&mut registry, combo("b", &[&[31], &[31]]));
        assert!(matches!(result, Err(RegistrationError::Taken { .. })));
        assert_eq!(registry.lookup_id(31), Some(b));
    }

    #[test]
    fn test_atomic_policy_rolls_back_repeated_chord() {
        let mut registry = Registry::new();
        let id = registry.store(combo("a", &[&[31], &[31]]));
        let result = registry.claim(id, RegistrationPolicy::Atomic);
        assert!(matches!(result, Err(RegistrationError::Taken { kept: None, .. })));
        assert_eq!(registry.claimed(), 0);
    }
}
