//! Property-based tests for the hierarchy and the lifecycle engine.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated hierarchies.

use arbor_hsm::core::{EmptyBehavior, StateBehavior, Transition};
use arbor_hsm::{HierarchicalStateMachine, MachineConfig, MachineError};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

type Machine = HierarchicalStateMachine<u32, u32>;

struct Recorder {
    id: u32,
    log: Rc<RefCell<Vec<(bool, u32)>>>,
}

impl StateBehavior for Recorder {
    fn enter(&self) {
        self.log.borrow_mut().push((true, self.id));
    }

    fn exit(&self) {
        self.log.borrow_mut().push((false, self.id));
    }
}

/// State `i + 1` is attached under `parents[i] % (i + 1)`, so every
/// generated hierarchy is a tree rooted at 0.
fn tree(parents: &[usize], log: &Rc<RefCell<Vec<(bool, u32)>>>) -> Machine {
    let machine = Machine::new();
    for id in 0..=parents.len() as u32 {
        let behavior = Rc::new(Recorder {
            id,
            log: log.clone(),
        });
        machine.add_state(id, behavior).unwrap();
    }
    for (index, parent) in parents.iter().enumerate() {
        let child = index as u32 + 1;
        let parent = (parent % (index + 1)) as u32;
        machine.add_child_to(&parent, &child).unwrap();
    }
    machine
}

fn assert_consistent(machine: &Machine) -> Result<(), TestCaseError> {
    let states = machine.states();
    for state in &states {
        let parent = machine.parent_of(state).unwrap();
        if parent == *state {
            prop_assert!(machine.roots().contains(state));
        } else {
            prop_assert!(machine
                .immediate_children_of(&parent)
                .unwrap()
                .contains(state));
            prop_assert!(machine.are_immediate_parent_and_child(&parent, state));
        }
        for child in machine.immediate_children_of(state).unwrap() {
            prop_assert_eq!(machine.parent_of(&child).unwrap(), *state);
        }
        if let Some(initial) = machine.initial_state_of(state).unwrap() {
            prop_assert!(machine.are_immediate_parent_and_child(state, &initial));
        }

        // Walking up must reach a root within `states.len()` steps.
        let mut cursor = *state;
        let mut steps = 0;
        loop {
            let next = machine.parent_of(&cursor).unwrap();
            if next == cursor {
                break;
            }
            cursor = next;
            steps += 1;
            prop_assert!(steps <= states.len());
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn random_relations_keep_the_tree_consistent(
        count in 1..10u32,
        operations in prop::collection::vec((0..10u32, 0..10u32, any::<bool>()), 0..40),
    ) {
        let machine = Machine::new();
        for id in 0..count {
            machine.add_state(id, Rc::new(EmptyBehavior)).unwrap();
        }

        for (parent, child, attach) in operations {
            let result = if attach {
                machine.add_child_to(&parent, &child)
            } else {
                machine.remove_child_from_parent(&child).map(|_| ())
            };
            match result {
                Ok(()) => {}
                Err(MachineError::UnknownId { .. })
                | Err(MachineError::SelfChild { .. })
                | Err(MachineError::ChildAlreadyHasParent { .. })
                | Err(MachineError::CyclicRelation { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
            assert_consistent(&machine)?;
        }
    }

    #[test]
    fn duplicate_ids_are_always_rejected(
        parents in prop::collection::vec(0..100usize, 0..10),
        duplicate in 0..10u32,
    ) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let machine = tree(&parents, &log);
        let duplicate = duplicate % machine.state_count() as u32;

        let result = machine.add_state(duplicate, Rc::new(EmptyBehavior));

        prop_assert!(
            matches!(result, Err(MachineError::DuplicateId { .. })),
            "expected a duplicate id error"
        );
        prop_assert_eq!(machine.state_count(), parents.len() + 1);
    }

    #[test]
    fn stop_exits_in_reverse_enter_order(parents in prop::collection::vec(0..100usize, 0..12)) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let machine = tree(&parents, &log);

        machine.start().unwrap();
        let path = machine.active_hierarchy_path();
        prop_assert_eq!(path.first(), Some(&0));
        for pair in path.windows(2) {
            prop_assert!(machine.are_immediate_parent_and_child(&pair[0], &pair[1]));
        }
        let leaf = *path.last().unwrap();
        prop_assert_eq!(machine.initial_state_of(&leaf).unwrap(), None);

        machine.stop().unwrap();

        let log = log.borrow();
        let (entered, exited): (Vec<_>, Vec<_>) = log.iter().partition(|(enter, _)| *enter);
        let entered: Vec<u32> = entered.into_iter().map(|(_, id)| id).collect();
        let mut exited: Vec<u32> = exited.into_iter().map(|(_, id)| id).collect();
        exited.reverse();
        prop_assert_eq!(&entered, &path);
        prop_assert_eq!(entered, exited);
    }

    #[test]
    fn transitions_always_leave_a_root_first_chain(
        parents in prop::collection::vec(0..100usize, 1..12),
        targets in prop::collection::vec(0..100u32, 1..8),
    ) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let machine = tree(&parents, &log);
        let count = machine.state_count() as u32;
        for to in 0..count {
            machine.add_transition(Transition::new(0, to, to)).unwrap();
        }
        machine.start().unwrap();

        for target in targets {
            let target = target % count;
            machine.trigger(target).unwrap();

            let path = machine.active_hierarchy_path();
            prop_assert!(machine.is_in_state(&target));
            prop_assert_eq!(machine.parent_of(&path[0]).unwrap(), path[0]);
            for pair in path.windows(2) {
                prop_assert!(machine.are_immediate_parent_and_child(&pair[0], &pair[1]));
            }
        }
    }

    #[test]
    fn history_never_exceeds_its_limit(limit in 0..5usize, triggers in 0..12usize) {
        let machine: Machine = HierarchicalStateMachine::with_options(
            Rc::new(arbor_hsm::core::NaturalEq),
            Rc::new(arbor_hsm::core::NaturalEq),
            MachineConfig::default().with_history_limit(limit),
        );
        machine.add_state(0, Rc::new(EmptyBehavior)).unwrap();
        machine.add_transition(Transition::new(0, 0, 0)).unwrap();
        machine.start().unwrap();

        for _ in 0..triggers {
            machine.trigger(0).unwrap();
        }

        prop_assert_eq!(machine.transition_history().len(), triggers.min(limit));
    }
}
