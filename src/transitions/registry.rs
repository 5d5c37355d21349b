//! Registered transitions grouped by source state.

use crate::core::{IdMap, SharedComparer, Transition};

/// The set of registered transitions.
///
/// Transitions are grouped by `from` so evaluation only looks at the
/// transitions of active states. Within a group, registration order is
/// preserved and decides which candidate is tried first.
pub struct TransitionRegistry<S, T> {
    triggers: SharedComparer<T>,
    by_source: IdMap<S, Vec<Transition<S, T>>>,
    count: usize,
}

impl<S: Clone, T: Clone> TransitionRegistry<S, T> {
    pub fn new(states: SharedComparer<S>, triggers: SharedComparer<T>) -> Self {
        Self {
            triggers,
            by_source: IdMap::new(states),
            count: 0,
        }
    }

    fn same(&self, a: &Transition<S, T>, b: &Transition<S, T>) -> bool {
        a.matches(b, self.by_source.comparer().as_ref(), self.triggers.as_ref())
    }

    /// Registers `transition`; returns `false` if it was already present.
    pub fn add_transition(&mut self, transition: Transition<S, T>) -> bool {
        if self.contains_transition(&transition) {
            return false;
        }
        self.by_source
            .get_or_insert_with(transition.from.clone(), Vec::new)
            .push(transition);
        self.count += 1;
        true
    }

    pub fn remove_transition(&mut self, transition: &Transition<S, T>) -> bool {
        let triggers = self.triggers.clone();
        let states = self.by_source.comparer().clone();
        let Some(group) = self.by_source.get_mut(&transition.from) else {
            return false;
        };
        let Some(index) = group
            .iter()
            .position(|existing| existing.matches(transition, states.as_ref(), triggers.as_ref()))
        else {
            return false;
        };
        group.remove(index);
        if group.is_empty() {
            self.by_source.remove(&transition.from);
        }
        self.count -= 1;
        true
    }

    pub fn contains_transition(&self, transition: &Transition<S, T>) -> bool {
        self.by_source
            .get(&transition.from)
            .is_some_and(|group| group.iter().any(|existing| self.same(existing, transition)))
    }

    pub fn transition_count(&self) -> usize {
        self.count
    }

    /// Snapshot of every registered transition.
    pub fn transitions(&self) -> Vec<Transition<S, T>> {
        self.by_source.values().flatten().cloned().collect()
    }

    /// Transitions declared on `state`, in registration order.
    pub fn transitions_from(&self, state: &S) -> &[Transition<S, T>] {
        self.by_source
            .get(state)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Removes every transition with `state` as an endpoint and returns
    /// them so their guards can be dropped too.
    pub fn remove_transitions_touching(&mut self, state: &S) -> Vec<Transition<S, T>> {
        let states = self.by_source.comparer().clone();
        let mut removed = self
            .by_source
            .remove(state)
            .map(|(_, group)| group)
            .unwrap_or_default();

        for group in self.by_source.values_mut() {
            let mut index = 0;
            while index < group.len() {
                if group[index].touches(state, states.as_ref()) {
                    removed.push(group.remove(index));
                } else {
                    index += 1;
                }
            }
        }
        let emptied: Vec<S> = self
            .by_source
            .iter()
            .filter(|(_, group)| group.is_empty())
            .map(|(source, _)| source.clone())
            .collect();
        for source in &emptied {
            self.by_source.remove(source);
        }

        self.count -= removed.len();
        removed
    }

    /// Transitions matching `trigger` declared on any of `sources`, in the
    /// order of `sources` and then registration order.
    pub fn candidates(&self, sources: &[S], trigger: &T) -> Vec<Transition<S, T>> {
        sources
            .iter()
            .flat_map(|source| self.transitions_from(source))
            .filter(|transition| self.triggers.equals(&transition.trigger, trigger))
            .cloned()
            .collect()
    }
}
