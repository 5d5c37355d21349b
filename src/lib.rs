//! Arbor: a hierarchical state machine engine
//!
//! States form a tree. Starting the machine enters a root-to-leaf branch of
//! that tree, the *active hierarchy path*, by following initial children.
//! Triggers move the active path along registered, guard-gated transitions:
//! states below the common ancestor of the old and new branch are exited
//! leaf first, then the new branch is entered root first.
//!
//! # Core Concepts
//!
//! - **Behaviors**: host objects receiving `enter`, `exit` and `update`
//! - **Transitions**: `(from, trigger, to)` rules gated by guard conditions
//! - **Events**: values bubbled from the active leaf towards the root
//! - **Control state**: rejects calls that would corrupt work in progress
//!
//! # Example
//!
//! ```rust
//! use arbor_hsm::core::{StateBehavior, Transition};
//! use arbor_hsm::HierarchicalStateMachine;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! struct Logged(&'static str, Rc<RefCell<Vec<String>>>);
//!
//! impl StateBehavior for Logged {
//!     fn enter(&self) {
//!         self.1.borrow_mut().push(format!("enter {}", self.0));
//!     }
//!
//!     fn exit(&self) {
//!         self.1.borrow_mut().push(format!("exit {}", self.0));
//!     }
//! }
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let machine: HierarchicalStateMachine<&str, &str> = HierarchicalStateMachine::new();
//! for id in ["a", "b", "c"] {
//!     machine.add_state(id, Rc::new(Logged(id, log.clone()))).unwrap();
//! }
//! machine.add_child_to(&"a", &"b").unwrap();
//! machine.add_child_to(&"a", &"c").unwrap();
//! machine.add_transition(Transition::new("a", "t", "c")).unwrap();
//!
//! machine.start().unwrap();
//! machine.trigger("t").unwrap();
//!
//! assert_eq!(machine.active_hierarchy_path(), vec!["a", "c"]);
//! assert_eq!(*log.borrow(), vec!["enter a", "enter b", "exit b", "enter c"]);
//! ```

pub mod builder;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod hierarchy;
pub mod machine;
pub mod scheduler;
pub mod transitions;

// Re-export commonly used types
pub use crate::builder::{BuildError, MachineBuilder};
pub use crate::core::{Guard, StateBehavior, Transition};
pub use crate::error::{MachineError, Result};
pub use crate::machine::{ControlState, HierarchicalStateMachine, MachineConfig};
