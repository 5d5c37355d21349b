//! The machine facade and its control state.
//!
//! [`HierarchicalStateMachine`] composes the hierarchy, the transition
//! registry and validator, the active path scheduler and the event
//! dispatcher behind one API.

mod config;
mod control;
mod engine;
mod listeners;

pub use config::{ConfigError, MachineConfig};
pub use control::ControlState;
pub use engine::HierarchicalStateMachine;
pub use listeners::{ListenerId, PathListener};
