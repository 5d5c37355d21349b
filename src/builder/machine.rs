//! Declarative construction of hierarchical state machines.

use crate::builder::error::BuildError;
use crate::core::{
    NaturalEq, SharedBehavior, SharedComparer, SharedGuard, SharedHandler, Transition,
};
use crate::error::MachineError;
use crate::machine::{HierarchicalStateMachine, MachineConfig};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

enum Declaration<S, T, E> {
    State(S, SharedBehavior),
    Child { parent: S, child: S },
    InitialChild { parent: S, child: S },
    Initial(S),
    Transition(Transition<S, T>),
    Guard(Transition<S, T>, SharedGuard),
    Handler(S, SharedHandler<E>),
}

/// Collects declarations and applies them in order on [`build`](Self::build).
///
/// Every rejected declaration is reported, not just the first one.
///
/// # Example
///
/// ```rust
/// use arbor_hsm::builder::MachineBuilder;
/// use arbor_hsm::core::{EmptyBehavior, Guard, Transition};
/// use std::rc::Rc;
///
/// let machine = MachineBuilder::<&str, &str>::new()
///     .state("door", Rc::new(EmptyBehavior))
///     .state("closed", Rc::new(EmptyBehavior))
///     .state("open", Rc::new(EmptyBehavior))
///     .child("door", "closed")
///     .child("door", "open")
///     .transition("closed", "push", "open")
///     .guard(
///         Transition::new("closed", "push", "open"),
///         Guard::shared("unlocked", || true),
///     )
///     .build()
///     .unwrap();
///
/// machine.start().unwrap();
/// machine.trigger("push").unwrap();
/// assert!(machine.is_in_state(&"open"));
/// ```
pub struct MachineBuilder<S, T, E = ()> {
    states: SharedComparer<S>,
    triggers: SharedComparer<T>,
    config: MachineConfig,
    declarations: Vec<Declaration<S, T, E>>,
}

impl<S, T, E> MachineBuilder<S, T, E>
where
    S: Clone + Debug + Eq + Hash,
    T: Clone + Debug + Eq + Hash,
{
    /// Builder for a machine comparing ids with their own `Eq` and `Hash`.
    pub fn new() -> Self {
        Self::with_comparers(Rc::new(NaturalEq), Rc::new(NaturalEq))
    }
}

impl<S, T, E> Default for MachineBuilder<S, T, E>
where
    S: Clone + Debug + Eq + Hash,
    T: Clone + Debug + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Debug, T: Clone + Debug, E> MachineBuilder<S, T, E> {
    pub fn with_comparers(states: SharedComparer<S>, triggers: SharedComparer<T>) -> Self {
        Self {
            states,
            triggers,
            config: MachineConfig::default(),
            declarations: Vec::new(),
        }
    }

    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn state(mut self, id: S, behavior: SharedBehavior) -> Self {
        self.declarations.push(Declaration::State(id, behavior));
        self
    }

    pub fn child(mut self, parent: S, child: S) -> Self {
        self.declarations
            .push(Declaration::Child { parent, child });
        self
    }

    /// Overrides the initial child of `parent`, which otherwise is its
    /// first declared child.
    pub fn initial_child(mut self, parent: S, child: S) -> Self {
        self.declarations
            .push(Declaration::InitialChild { parent, child });
        self
    }

    /// Sets the global initial state, which otherwise is the first
    /// declared state.
    pub fn initial(mut self, id: S) -> Self {
        self.declarations.push(Declaration::Initial(id));
        self
    }

    pub fn transition(mut self, from: S, trigger: T, to: S) -> Self {
        self.declarations
            .push(Declaration::Transition(Transition::new(from, trigger, to)));
        self
    }

    pub fn guard(mut self, transition: Transition<S, T>, guard: SharedGuard) -> Self {
        self.declarations
            .push(Declaration::Guard(transition, guard));
        self
    }

    pub fn handler(mut self, state: S, handler: SharedHandler<E>) -> Self {
        self.declarations.push(Declaration::Handler(state, handler));
        self
    }

    /// Build the machine.
    /// Returns every rejected declaration if any fails.
    pub fn build(self) -> Result<HierarchicalStateMachine<S, T, E>, BuildError> {
        let has_states = self
            .declarations
            .iter()
            .any(|declaration| matches!(declaration, Declaration::State(..)));
        if !has_states {
            return Err(BuildError::NoStates);
        }

        let machine = HierarchicalStateMachine::with_options(self.states, self.triggers, self.config);
        let outcomes: Vec<Validation<(), NonEmptyVec<MachineError>>> = self
            .declarations
            .into_iter()
            .map(|declaration| apply(&machine, declaration))
            .collect();

        match Validation::all_vec(outcomes) {
            Validation::Success(_) => Ok(machine),
            Validation::Failure(errors) => Err(BuildError::Rejected(errors.into_vec())),
        }
    }
}

fn apply<S: Clone + Debug, T: Clone + Debug, E>(
    machine: &HierarchicalStateMachine<S, T, E>,
    declaration: Declaration<S, T, E>,
) -> Validation<(), NonEmptyVec<MachineError>> {
    let outcome = match declaration {
        Declaration::State(id, behavior) => machine.add_state(id, behavior),
        Declaration::Child { parent, child } => machine.add_child_to(&parent, &child),
        Declaration::InitialChild { parent, child } => {
            machine.set_initial_state_to(&parent, &child)
        }
        Declaration::Initial(id) => machine.set_initial_state(&id),
        Declaration::Transition(transition) => machine.add_transition(transition),
        Declaration::Guard(transition, guard) => machine.add_guard_to(&transition, guard),
        Declaration::Handler(state, handler) => machine.add_event_handler_to(&state, handler),
    };
    match outcome {
        Ok(()) => Validation::success(()),
        Err(error) => Validation::fail(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EmptyBehavior, Guard};

    fn empty() -> SharedBehavior {
        Rc::new(EmptyBehavior)
    }

    #[test]
    fn builder_requires_states() {
        let result = MachineBuilder::<u8, u8>::new().initial(1).build();

        assert!(matches!(result, Err(BuildError::NoStates)));
    }

    #[test]
    fn builder_applies_declarations_in_order() {
        let machine = MachineBuilder::<u8, char>::new()
            .state(1, empty())
            .state(2, empty())
            .state(3, empty())
            .child(1, 2)
            .child(1, 3)
            .initial_child(1, 3)
            .transition(3, 'x', 2)
            .build()
            .unwrap();

        assert_eq!(machine.initial_state_of(&1).unwrap(), Some(3));
        assert_eq!(machine.transition_count(), 1);

        machine.start().unwrap();
        assert_eq!(machine.active_hierarchy_path(), vec![1, 3]);
    }

    #[test]
    fn builder_accumulates_every_rejection() {
        let result = MachineBuilder::<u8, char>::new()
            .state(1, empty())
            .state(1, empty())
            .child(1, 9)
            .transition(1, 'x', 7)
            .guard(Transition::new(1, 'y', 1), Guard::shared("g", || true))
            .build();

        let Err(error) = result else {
            panic!("expected rejected declarations");
        };
        let errors = error.errors();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], MachineError::DuplicateId { .. }));
        assert!(matches!(errors[1], MachineError::UnknownId { .. }));
        assert!(matches!(errors[2], MachineError::UnknownId { .. }));
        assert!(matches!(
            errors[3],
            MachineError::TransitionNotRegistered { .. }
        ));
        assert_eq!(error.to_string(), "4 declaration(s) rejected");
    }

    #[test]
    fn handlers_are_attached_to_their_state() {
        let handler: SharedHandler<u32> = Rc::new(|event: &u32| *event == 7);
        let machine = MachineBuilder::<u8, char, u32>::new()
            .state(1, empty())
            .handler(1, handler.clone())
            .build()
            .unwrap();

        assert!(machine.has_event_handler_on(&1, &handler));
        machine.start().unwrap();
        assert!(machine.send_event(&7).unwrap());
        assert!(!machine.send_event(&8).unwrap());
    }
}
