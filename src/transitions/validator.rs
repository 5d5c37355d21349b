//! Guard conditions keyed by transition.

use crate::core::{same_guard, SharedComparer, SharedGuard, Transition};

struct GuardEntry<S, T> {
    transition: Transition<S, T>,
    guards: Vec<SharedGuard>,
}

/// Owns the guard multiset of every transition.
///
/// The validator does not know which transitions are registered; the
/// machine checks that before delegating here.
pub struct TransitionValidator<S, T> {
    states: SharedComparer<S>,
    triggers: SharedComparer<T>,
    entries: Vec<GuardEntry<S, T>>,
}

impl<S: Clone, T: Clone> TransitionValidator<S, T> {
    pub fn new(states: SharedComparer<S>, triggers: SharedComparer<T>) -> Self {
        Self {
            states,
            triggers,
            entries: Vec::new(),
        }
    }

    fn position(&self, transition: &Transition<S, T>) -> Option<usize> {
        self.entries.iter().position(|entry| {
            entry
                .transition
                .matches(transition, self.states.as_ref(), self.triggers.as_ref())
        })
    }

    /// Appends a guard. The same guard may be added more than once.
    pub fn add_guard_to(&mut self, transition: &Transition<S, T>, guard: SharedGuard) {
        match self.position(transition) {
            Some(index) => self.entries[index].guards.push(guard),
            None => self.entries.push(GuardEntry {
                transition: transition.clone(),
                guards: vec![guard],
            }),
        }
    }

    /// Removes the first registration of `guard`.
    pub fn remove_guard_from(&mut self, transition: &Transition<S, T>, guard: &SharedGuard) -> bool {
        let Some(index) = self.position(transition) else {
            return false;
        };
        let guards = &mut self.entries[index].guards;
        let Some(slot) = guards.iter().position(|existing| same_guard(existing, guard)) else {
            return false;
        };
        guards.remove(slot);
        if guards.is_empty() {
            self.entries.remove(index);
        }
        true
    }

    pub fn contains_guard_on(&self, transition: &Transition<S, T>, guard: &SharedGuard) -> bool {
        self.position(transition).is_some_and(|index| {
            self.entries[index]
                .guards
                .iter()
                .any(|existing| same_guard(existing, guard))
        })
    }

    /// Snapshot of the guards on `transition`, in registration order. The
    /// machine evaluates this snapshot with [`all_accept`](crate::core::all_accept)
    /// so guards never run while the validator is borrowed.
    pub fn guards_of(&self, transition: &Transition<S, T>) -> Vec<SharedGuard> {
        self.position(transition)
            .map(|index| self.entries[index].guards.clone())
            .unwrap_or_default()
    }

    pub fn remove_all_guards_from(&mut self, transition: &Transition<S, T>) {
        if let Some(index) = self.position(transition) {
            self.entries.remove(index);
        }
    }
}
