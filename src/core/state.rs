//! State behavior capability.
//!
//! A state in the hierarchy is an identifier plus a behavior object owned by
//! the host. The machine only ever calls the three lifecycle hooks below.

use std::rc::Rc;

/// Lifecycle hooks invoked by the machine on states of the active path.
///
/// All methods take `&self`: behaviors that keep state use interior
/// mutability. Hooks may call back into the machine that invoked them.
///
/// Every hook defaults to doing nothing.
///
/// # Example
///
/// ```rust
/// use arbor_hsm::core::StateBehavior;
/// use std::cell::Cell;
///
/// #[derive(Default)]
/// struct Blinker {
///     ticks: Cell<u32>,
/// }
///
/// impl StateBehavior for Blinker {
///     fn enter(&self) {
///         self.ticks.set(0);
///     }
///
///     fn update(&self) {
///         self.ticks.set(self.ticks.get() + 1);
///     }
/// }
///
/// let blinker = Blinker::default();
/// blinker.enter();
/// blinker.update();
/// assert_eq!(blinker.ticks.get(), 1);
/// ```
pub trait StateBehavior {
    /// Called when the state joins the active path, parents before children.
    fn enter(&self) {}

    /// Called when the state leaves the active path, children before parents.
    fn exit(&self) {}

    /// Called once per machine update while the state is active.
    fn update(&self) {}
}

/// Behavior handle shared between the host and the machine.
///
/// The same behavior object may back several state ids.
pub type SharedBehavior = Rc<dyn StateBehavior>;

/// Behavior that does nothing; useful for pure grouping states.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyBehavior;

impl StateBehavior for EmptyBehavior {}
