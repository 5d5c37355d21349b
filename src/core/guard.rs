//! Guard conditions that gate transitions.
//!
//! Every guard registered on a transition must accept for the transition to
//! be eligible. Guards are identified by handle, not by value: the same
//! guard may be registered several times on one transition.

use std::fmt;
use std::rc::Rc;

/// Predicate capability consulted before a transition fires.
pub trait GuardCondition {
    fn is_valid(&self) -> bool;
}

/// Guard handle shared between the host and the machine.
pub type SharedGuard = Rc<dyn GuardCondition>;

/// Guard backed by a closure.
///
/// # Example
///
/// ```rust
/// use arbor_hsm::core::{Guard, GuardCondition};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let door_closed = Rc::new(Cell::new(false));
/// let flag = door_closed.clone();
/// let guard = Guard::new("door closed", move || flag.get());
///
/// assert!(!guard.is_valid());
/// door_closed.set(true);
/// assert!(guard.is_valid());
/// assert_eq!(guard.label(), "door closed");
/// ```
pub struct Guard {
    label: String,
    predicate: Box<dyn Fn() -> bool>,
}

impl Guard {
    /// Create a guard from a predicate. The label only shows up in logs.
    pub fn new<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        Self {
            label: label.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Convenience constructor returning a ready-to-register handle.
    pub fn shared<F>(label: impl Into<String>, predicate: F) -> SharedGuard
    where
        F: Fn() -> bool + 'static,
    {
        Rc::new(Self::new(label, predicate))
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl GuardCondition for Guard {
    fn is_valid(&self) -> bool {
        (self.predicate)()
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").field("label", &self.label).finish()
    }
}

/// Identity comparison of guard handles.
pub(crate) fn same_guard(a: &SharedGuard, b: &SharedGuard) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Logical AND over `guards` in order, stopping at the first rejection.
/// Vacuously true for an empty slice.
pub fn all_accept(guards: &[SharedGuard]) -> bool {
    guards.iter().all(|guard| guard.is_valid())
}
