//! Event handler capability used by hierarchical event dispatch.

use std::rc::Rc;

/// Receives ad-hoc events sent to the machine while its state is active.
///
/// Returns `true` when the event was handled, which stops propagation.
pub trait EventHandler<E> {
    fn handle(&self, event: &E) -> bool;
}

impl<E, F> EventHandler<E> for F
where
    F: Fn(&E) -> bool,
{
    fn handle(&self, event: &E) -> bool {
        self(event)
    }
}

/// Handler handle shared between the host and the machine.
pub type SharedHandler<E> = Rc<dyn EventHandler<E>>;

pub(crate) fn same_handler<E>(a: &SharedHandler<E>, b: &SharedHandler<E>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}
