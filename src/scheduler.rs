//! The active hierarchy path and the enter/exit plan that moves it.
//!
//! A path change is computed up front as a [`PathChange`] and then executed
//! one [`LifecycleStep`] at a time. The scheduler updates the active path
//! before handing each step out, so the caller can run the behavior call
//! with no scheduler borrow held and host code observes the path as it will
//! be once the call returns.

use crate::core::{SharedBehavior, SharedComparer};
use crate::error::{MachineError, Result};
use crate::hierarchy::StateHierarchy;
use std::collections::VecDeque;
use std::fmt::{self, Debug};

/// A single behavior call produced by a [`PathChange`].
pub enum LifecycleStep<S> {
    Enter { state: S, behavior: SharedBehavior },
    Exit { state: S, behavior: SharedBehavior },
}

impl<S> LifecycleStep<S> {
    pub fn state(&self) -> &S {
        match self {
            LifecycleStep::Enter { state, .. } | LifecycleStep::Exit { state, .. } => state,
        }
    }

    /// Calls `enter` or `exit` on the step's behavior.
    pub fn run(&self) {
        match self {
            LifecycleStep::Enter { behavior, .. } => behavior.enter(),
            LifecycleStep::Exit { behavior, .. } => behavior.exit(),
        }
    }
}

impl<S: Debug> Debug for LifecycleStep<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleStep::Enter { state, .. } => f.debug_tuple("Enter").field(state).finish(),
            LifecycleStep::Exit { state, .. } => f.debug_tuple("Exit").field(state).finish(),
        }
    }
}

/// An in-progress change of the active path.
///
/// Exits run leaf first down to `retained` entries, then the queued entries
/// are entered root first, then, when `descend` is set, initial children are
/// followed from the last entered state until a state without one.
#[derive(Debug)]
pub struct PathChange<S> {
    retained: usize,
    entries: VecDeque<S>,
    descend: bool,
    exited: Vec<S>,
    entered: Vec<S>,
}

impl<S> PathChange<S> {
    /// States exited so far, leaf first.
    pub fn exited(&self) -> &[S] {
        &self.exited
    }

    /// States entered so far, root first.
    pub fn entered(&self) -> &[S] {
        &self.entered
    }

    pub fn into_parts(self) -> (Vec<S>, Vec<S>) {
        (self.exited, self.entered)
    }
}

/// Owner of the active hierarchy path, root first.
pub struct ActivePathScheduler<S> {
    comparer: SharedComparer<S>,
    active: Vec<S>,
}

impl<S: Clone + Debug> ActivePathScheduler<S> {
    pub fn new(comparer: SharedComparer<S>) -> Self {
        Self {
            comparer,
            active: Vec::new(),
        }
    }

    pub fn is_in_state(&self, id: &S) -> bool {
        self.active
            .iter()
            .any(|active| self.comparer.equals(active, id))
    }

    pub fn active_hierarchy_path(&self) -> &[S] {
        &self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Plan for the start descent: the global initial state's ancestors,
    /// the state itself, then its initial-child chain.
    pub fn begin_enter(&self, hierarchy: &StateHierarchy<S>) -> Result<PathChange<S>> {
        if hierarchy.state_count() == 0 {
            return Err(MachineError::EngineEmpty);
        }
        let target = hierarchy
            .initial_state()
            .cloned()
            .ok_or(MachineError::NoInitialState)?;
        let mut entries: VecDeque<S> = hierarchy.ancestors_of(&target)?.into();
        entries.push_back(target);
        Ok(PathChange {
            retained: 0,
            entries,
            descend: true,
            exited: Vec::new(),
            entered: Vec::new(),
        })
    }

    /// Plan for a transition into `to`.
    ///
    /// The active states shared with `to`'s ancestor chain stay untouched;
    /// everything below them is exited, and the rest of the chain down to
    /// `to` is entered before descending through initial children. A
    /// transition into an active state exits and re-enters that state.
    pub fn begin_transition(&self, to: &S, hierarchy: &StateHierarchy<S>) -> Result<PathChange<S>> {
        let chain = hierarchy.ancestors_of(to)?;
        let retained = self
            .active
            .iter()
            .zip(&chain)
            .take_while(|(active, ancestor)| self.comparer.equals(active, ancestor))
            .count();
        let mut entries: VecDeque<S> = chain.into_iter().skip(retained).collect();
        entries.push_back(to.clone());
        Ok(PathChange {
            retained,
            entries,
            descend: true,
            exited: Vec::new(),
            entered: Vec::new(),
        })
    }

    /// Plan for exiting every active state, leaf first.
    pub fn begin_exit_all(&self) -> PathChange<S> {
        PathChange {
            retained: 0,
            entries: VecDeque::new(),
            descend: false,
            exited: Vec::new(),
            entered: Vec::new(),
        }
    }

    /// Produces the next step of `change` and applies it to the active path.
    /// Returns `None` once the change is complete.
    pub fn advance(
        &mut self,
        change: &mut PathChange<S>,
        hierarchy: &StateHierarchy<S>,
    ) -> Result<Option<LifecycleStep<S>>> {
        if self.active.len() > change.retained {
            let Some(state) = self.active.last().cloned() else {
                return Ok(None);
            };
            let behavior = hierarchy.behavior_of(&state)?;
            self.active.pop();
            change.exited.push(state.clone());
            return Ok(Some(LifecycleStep::Exit { state, behavior }));
        }

        let next = match change.entries.pop_front() {
            Some(state) => Some(state),
            None if change.descend => match self.active.last() {
                Some(last) => hierarchy.initial_state_of(last)?,
                None => None,
            },
            None => None,
        };
        let Some(state) = next else {
            return Ok(None);
        };

        let behavior = hierarchy.behavior_of(&state)?;
        self.active.push(state.clone());
        change.retained = self.active.len();
        change.entered.push(state.clone());
        Ok(Some(LifecycleStep::Enter { state, behavior }))
    }

    /// Snapshot of the behaviors on the active path, root first.
    pub fn active_behaviors(&self, hierarchy: &StateHierarchy<S>) -> Vec<(S, SharedBehavior)> {
        self.active
            .iter()
            .filter_map(|id| {
                hierarchy
                    .behavior_of(id)
                    .ok()
                    .map(|behavior| (id.clone(), behavior))
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EmptyBehavior, NaturalEq};
    use std::rc::Rc;

    /// 1 -> {2 -> {4}, 3}
    fn tree() -> StateHierarchy<u32> {
        let mut hierarchy = StateHierarchy::new(Rc::new(NaturalEq));
        for id in 1..=4 {
            hierarchy.add_state(id, Rc::new(EmptyBehavior)).unwrap();
        }
        hierarchy.add_child_to(&1, &2).unwrap();
        hierarchy.add_child_to(&1, &3).unwrap();
        hierarchy.add_child_to(&2, &4).unwrap();
        hierarchy
    }

    fn scheduler() -> ActivePathScheduler<u32> {
        ActivePathScheduler::new(Rc::new(NaturalEq))
    }

    fn run(
        scheduler: &mut ActivePathScheduler<u32>,
        mut change: PathChange<u32>,
        hierarchy: &StateHierarchy<u32>,
    ) -> Vec<String> {
        let mut steps = Vec::new();
        while let Some(step) = scheduler.advance(&mut change, hierarchy).unwrap() {
            steps.push(format!("{step:?}"));
        }
        steps
    }

    #[test]
    fn start_descends_through_initial_children() {
        let hierarchy = tree();
        let mut scheduler = scheduler();
        let change = scheduler.begin_enter(&hierarchy).unwrap();

        let steps = run(&mut scheduler, change, &hierarchy);

        assert_eq!(steps, vec!["Enter(1)", "Enter(2)", "Enter(4)"]);
        assert_eq!(scheduler.active_hierarchy_path(), &[1, 2, 4]);
        assert!(scheduler.is_in_state(&2));
        assert!(!scheduler.is_in_state(&3));
    }

    #[test]
    fn start_from_a_nested_initial_state_enters_its_ancestors_first() {
        let mut hierarchy = tree();
        hierarchy.set_initial_state(&2).unwrap();
        let mut scheduler = scheduler();
        let change = scheduler.begin_enter(&hierarchy).unwrap();

        run(&mut scheduler, change, &hierarchy);

        assert_eq!(scheduler.active_hierarchy_path(), &[1, 2, 4]);
    }

    #[test]
    fn start_requires_states_and_an_initial_state() {
        let mut hierarchy: StateHierarchy<u32> = StateHierarchy::new(Rc::new(NaturalEq));
        let scheduler = scheduler();
        assert!(matches!(
            scheduler.begin_enter(&hierarchy),
            Err(MachineError::EngineEmpty)
        ));

        hierarchy.add_state(1, Rc::new(EmptyBehavior)).unwrap();
        hierarchy.add_state(2, Rc::new(EmptyBehavior)).unwrap();
        hierarchy.remove_state(&1);
        assert!(matches!(
            scheduler.begin_enter(&hierarchy),
            Err(MachineError::NoInitialState)
        ));
    }

    #[test]
    fn transition_exits_below_the_common_ancestor_only() {
        let hierarchy = tree();
        let mut scheduler = scheduler();
        let change = scheduler.begin_enter(&hierarchy).unwrap();
        run(&mut scheduler, change, &hierarchy);

        let change = scheduler.begin_transition(&3, &hierarchy).unwrap();
        let steps = run(&mut scheduler, change, &hierarchy);

        assert_eq!(steps, vec!["Exit(4)", "Exit(2)", "Enter(3)"]);
        assert_eq!(scheduler.active_hierarchy_path(), &[1, 3]);
    }

    #[test]
    fn transition_into_an_active_state_reenters_it() {
        let hierarchy = tree();
        let mut scheduler = scheduler();
        let change = scheduler.begin_enter(&hierarchy).unwrap();
        run(&mut scheduler, change, &hierarchy);

        let change = scheduler.begin_transition(&2, &hierarchy).unwrap();
        let steps = run(&mut scheduler, change, &hierarchy);

        assert_eq!(steps, vec!["Exit(4)", "Exit(2)", "Enter(2)", "Enter(4)"]);
        assert_eq!(scheduler.active_hierarchy_path(), &[1, 2, 4]);
    }

    #[test]
    fn transition_to_another_root_swaps_the_whole_branch() {
        let mut hierarchy = tree();
        hierarchy.add_state(5, Rc::new(EmptyBehavior)).unwrap();
        let mut scheduler = scheduler();
        let change = scheduler.begin_enter(&hierarchy).unwrap();
        run(&mut scheduler, change, &hierarchy);

        let mut change = scheduler.begin_transition(&5, &hierarchy).unwrap();
        while scheduler.advance(&mut change, &hierarchy).unwrap().is_some() {}

        assert_eq!(change.exited(), &[4, 2, 1]);
        assert_eq!(change.entered(), &[5]);
        assert_eq!(scheduler.active_hierarchy_path(), &[5]);
    }

    #[test]
    fn exit_all_runs_leaf_first() {
        let hierarchy = tree();
        let mut scheduler = scheduler();
        let change = scheduler.begin_enter(&hierarchy).unwrap();
        run(&mut scheduler, change, &hierarchy);

        let change = scheduler.begin_exit_all();
        let steps = run(&mut scheduler, change, &hierarchy);

        assert_eq!(steps, vec!["Exit(4)", "Exit(2)", "Exit(1)"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn descent_reads_initial_children_as_it_goes() {
        let mut hierarchy = tree();
        let mut scheduler = scheduler();
        let mut change = scheduler.begin_enter(&hierarchy).unwrap();

        let first = scheduler.advance(&mut change, &hierarchy).unwrap().unwrap();
        assert_eq!(first.state(), &1);
        hierarchy.set_initial_state_to(&1, &3).unwrap();
        while scheduler.advance(&mut change, &hierarchy).unwrap().is_some() {}

        assert_eq!(scheduler.active_hierarchy_path(), &[1, 3]);
    }
}
