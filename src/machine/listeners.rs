//! Subscribers to active path changes.

use std::rc::Rc;

/// Callback receiving the trigger that caused a path change, or `None` for
/// the start descent.
pub type PathListener<T> = Rc<dyn Fn(Option<&T>)>;

/// Handle returned on subscription, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PathEvent {
    BeforeChange,
    Changed,
}

pub(crate) struct PathListeners<T> {
    next_id: u64,
    subscribed: Vec<(ListenerId, PathEvent, PathListener<T>)>,
}

impl<T> PathListeners<T> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            subscribed: Vec::new(),
        }
    }

    pub(crate) fn subscribe(&mut self, event: PathEvent, listener: PathListener<T>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.subscribed.push((id, event, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.subscribed.len();
        self.subscribed.retain(|(existing, _, _)| *existing != id);
        self.subscribed.len() != before
    }

    /// Listeners for `event` in subscription order, cloned so they can run
    /// without the collection borrowed.
    pub(crate) fn snapshot(&self, event: PathEvent) -> Vec<PathListener<T>> {
        self.subscribed
            .iter()
            .filter(|(_, kind, _)| *kind == event)
            .map(|(_, _, listener)| listener.clone())
            .collect()
    }
}
