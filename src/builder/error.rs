//! Build errors for the machine builder.

use crate::error::MachineError;
use thiserror::Error;

/// Errors that can occur when building a machine from declarations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("No states declared. Call .state(id, behavior) before .build()")]
    NoStates,

    /// Every declaration that failed, in declaration order.
    #[error("{} declaration(s) rejected", .0.len())]
    Rejected(Vec<MachineError>),
}

impl BuildError {
    pub fn errors(&self) -> &[MachineError] {
        match self {
            BuildError::NoStates => &[],
            BuildError::Rejected(errors) => errors,
        }
    }
}
