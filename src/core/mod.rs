//! Core primitives shared by every machine component.
//!
//! This module contains the host-facing capabilities and value types:
//! - Identifier comparers and the comparer-keyed [`IdMap`]
//! - Behavior, guard and event handler capabilities
//! - The [`Transition`] value type and the executed-transition history

mod comparer;
mod event;
mod guard;
mod history;
mod state;
mod transition;

pub use comparer::{IdComparer, IdMap, NaturalEq, SharedComparer};
pub use event::{EventHandler, SharedHandler};
pub use guard::{all_accept, Guard, GuardCondition, SharedGuard};
pub use history::{TransitionHistory, TransitionRecord};
pub use state::{EmptyBehavior, SharedBehavior, StateBehavior};
pub use transition::Transition;

pub(crate) use event::same_handler;
pub(crate) use guard::same_guard;
