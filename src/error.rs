//! Errors raised by machine operations.
//!
//! Identifiers are rendered with their `Debug` form so the error type stays
//! independent of the machine's id types.

use crate::machine::ControlState;
use std::fmt::Debug;
use thiserror::Error;

/// Errors returned by hierarchy, transition and lifecycle operations.
///
/// Every operation validates before mutating: when an error is returned the
/// machine is left exactly as it was.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("State {id} is already registered")]
    DuplicateId { id: String },

    #[error("State {id} is not registered")]
    UnknownId { id: String },

    #[error("State {id} cannot be its own child")]
    SelfChild { id: String },

    #[error("State {child} already has parent {parent}")]
    ChildAlreadyHasParent { child: String, parent: String },

    #[error("Adding {child} under {parent} would make {child} its own ancestor")]
    CyclicRelation { parent: String, child: String },

    #[error("State {child} is not an immediate child of {parent}")]
    NotAChild { parent: String, child: String },

    #[error("State {parent} is the active leaf; it cannot receive its first child {child}")]
    ActiveLeaf { parent: String, child: String },

    #[error("State {id} is protected: {reason}")]
    ProtectedState { id: String, reason: String },

    #[error("Transition {from} --{trigger}--> {to} is not registered")]
    TransitionNotRegistered {
        from: String,
        trigger: String,
        to: String,
    },

    #[error("Cannot start a machine without states")]
    EngineEmpty,

    #[error("Cannot start: no initial state is set")]
    NoInitialState,

    #[error("Operation not permitted while the machine is {0}")]
    InvalidControlState(ControlState),
}

pub type Result<T> = std::result::Result<T, MachineError>;

pub(crate) fn render<I: Debug>(id: &I) -> String {
    format!("{id:?}")
}

impl MachineError {
    pub(crate) fn unknown<I: Debug>(id: &I) -> Self {
        Self::UnknownId { id: render(id) }
    }

    pub(crate) fn protected<I: Debug>(id: &I, reason: impl Into<String>) -> Self {
        Self::ProtectedState {
            id: render(id),
            reason: reason.into(),
        }
    }

    pub(crate) fn transition_not_registered<S: Debug, T: Debug>(
        transition: &crate::core::Transition<S, T>,
    ) -> Self {
        Self::TransitionNotRegistered {
            from: render(&transition.from),
            trigger: render(&transition.trigger),
            to: render(&transition.to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_include_rendered_ids() {
        let error = MachineError::unknown(&"door");
        assert_eq!(error.to_string(), "State \"door\" is not registered");

        let error = MachineError::CyclicRelation {
            parent: render(&3),
            child: render(&1),
        };
        assert_eq!(
            error.to_string(),
            "Adding 1 under 3 would make 1 its own ancestor"
        );
    }

    #[test]
    fn control_state_errors_name_the_state() {
        let error = MachineError::InvalidControlState(ControlState::Stopped);
        assert_eq!(
            error.to_string(),
            "Operation not permitted while the machine is stopped"
        );
    }
}
