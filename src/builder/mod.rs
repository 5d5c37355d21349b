//! Builder API for declarative machine construction.
//!
//! [`MachineBuilder`] records states, relations, transitions, guards and
//! handlers, then applies them to a fresh machine in declaration order,
//! accumulating every rejected declaration instead of stopping at the first.

pub mod error;
pub mod machine;

pub use error::BuildError;
pub use machine::MachineBuilder;
