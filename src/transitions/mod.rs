//! Transition bookkeeping: the registry of transitions and the guard
//! validator that decides whether a registered transition may fire.

mod registry;
mod validator;

pub use registry::TransitionRegistry;
pub use validator::TransitionValidator;
