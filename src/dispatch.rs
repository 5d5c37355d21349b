//! Per-state event handler registrations.

use crate::core::{same_handler, IdMap, SharedComparer, SharedHandler};

/// Handlers registered on each state, in registration order, without
/// duplicates.
///
/// The dispatcher only stores registrations; the machine walks the active
/// path and invokes snapshots taken from here so handlers can modify the
/// registrations while an event is being delivered.
pub struct EventDispatcher<S, E> {
    handlers: IdMap<S, Vec<SharedHandler<E>>>,
}

impl<S: Clone, E> EventDispatcher<S, E> {
    pub fn new(comparer: SharedComparer<S>) -> Self {
        Self {
            handlers: IdMap::new(comparer),
        }
    }

    /// Registers `handler` on `state`; returns `false` if it already was.
    pub fn add_event_handler_to(&mut self, state: &S, handler: SharedHandler<E>) -> bool {
        let registered = self.handlers.get_or_insert_with(state.clone(), Vec::new);
        if registered
            .iter()
            .any(|existing| same_handler(existing, &handler))
        {
            return false;
        }
        registered.push(handler);
        true
    }

    pub fn remove_event_handler_from(&mut self, state: &S, handler: &SharedHandler<E>) -> bool {
        let Some(registered) = self.handlers.get_mut(state) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|existing| !same_handler(existing, handler));
        let removed = registered.len() != before;
        if registered.is_empty() {
            self.handlers.remove(state);
        }
        removed
    }

    pub fn has_event_handler_on(&self, state: &S, handler: &SharedHandler<E>) -> bool {
        self.handlers.get(state).is_some_and(|registered| {
            registered
                .iter()
                .any(|existing| same_handler(existing, handler))
        })
    }

    /// Snapshot of the handlers on `state`, in registration order.
    pub fn event_handlers_of(&self, state: &S) -> Vec<SharedHandler<E>> {
        self.handlers.get(state).cloned().unwrap_or_default()
    }

    pub fn remove_event_handlers_from(&mut self, state: &S) -> usize {
        self.handlers
            .remove(state)
            .map_or(0, |(_, registered)| registered.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NaturalEq;
    use std::rc::Rc;

    fn dispatcher() -> EventDispatcher<&'static str, u32> {
        EventDispatcher::new(Rc::new(NaturalEq))
    }

    #[test]
    fn handlers_are_a_unique_ordered_set() {
        let mut dispatcher = dispatcher();
        let first: SharedHandler<u32> = Rc::new(|_: &u32| false);
        let second: SharedHandler<u32> = Rc::new(|event: &u32| *event > 3);

        assert!(dispatcher.add_event_handler_to(&"idle", first.clone()));
        assert!(dispatcher.add_event_handler_to(&"idle", second.clone()));
        assert!(!dispatcher.add_event_handler_to(&"idle", first.clone()));

        let registered = dispatcher.event_handlers_of(&"idle");
        assert_eq!(registered.len(), 2);
        assert!(same_handler(&registered[0], &first));
        assert!(registered[1].handle(&4));
    }

    #[test]
    fn handlers_are_removed_per_state() {
        let mut dispatcher = dispatcher();
        let handler: SharedHandler<u32> = Rc::new(|_: &u32| true);
        dispatcher.add_event_handler_to(&"idle", handler.clone());
        dispatcher.add_event_handler_to(&"busy", handler.clone());

        assert!(!dispatcher.remove_event_handler_from(&"gone", &handler));
        assert!(dispatcher.remove_event_handler_from(&"idle", &handler));
        assert!(!dispatcher.has_event_handler_on(&"idle", &handler));
        assert!(dispatcher.has_event_handler_on(&"busy", &handler));

        assert_eq!(dispatcher.remove_event_handlers_from(&"busy"), 1);
        assert!(dispatcher.event_handlers_of(&"busy").is_empty());
    }
}
