//! The hierarchical state machine facade.

use super::config::MachineConfig;
use super::control::{ControlSignal, ControlState, Operation};
use super::listeners::{ListenerId, PathEvent, PathListeners};
use crate::core::{
    all_accept, NaturalEq, SharedBehavior, SharedComparer, SharedGuard, SharedHandler, Transition,
    TransitionHistory, TransitionRecord,
};
use crate::dispatch::EventDispatcher;
use crate::error::{MachineError, Result};
use crate::hierarchy::StateHierarchy;
use crate::scheduler::{ActivePathScheduler, PathChange};
use crate::transitions::{TransitionRegistry, TransitionValidator};
use chrono::Utc;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;
use tracing::{debug, trace};

/// A hierarchical state machine over state ids `S`, triggers `T` and
/// events `E`.
///
/// Every operation takes `&self`: behaviors, guards, handlers and listeners
/// may call back into the machine while they run. Calls that would corrupt
/// the work in progress are rejected by the [`ControlState`] checks, and
/// triggers fired during a transition are queued and evaluated once it
/// finishes.
///
/// # Example
///
/// ```rust
/// use arbor_hsm::core::{EmptyBehavior, Transition};
/// use arbor_hsm::machine::HierarchicalStateMachine;
/// use std::rc::Rc;
///
/// let machine: HierarchicalStateMachine<&str, &str> = HierarchicalStateMachine::new();
/// for id in ["player", "grounded", "airborne"] {
///     machine.add_state(id, Rc::new(EmptyBehavior)).unwrap();
/// }
/// machine.add_child_to(&"player", &"grounded").unwrap();
/// machine.add_child_to(&"player", &"airborne").unwrap();
/// machine
///     .add_transition(Transition::new("grounded", "jump", "airborne"))
///     .unwrap();
///
/// machine.start().unwrap();
/// assert_eq!(machine.active_hierarchy_path(), vec!["player", "grounded"]);
///
/// machine.trigger("jump").unwrap();
/// assert_eq!(machine.active_hierarchy_path(), vec!["player", "airborne"]);
/// ```
pub struct HierarchicalStateMachine<S, T, E = ()> {
    hierarchy: RefCell<StateHierarchy<S>>,
    registry: RefCell<TransitionRegistry<S, T>>,
    validator: RefCell<TransitionValidator<S, T>>,
    scheduler: RefCell<ActivePathScheduler<S>>,
    dispatcher: RefCell<EventDispatcher<S, E>>,
    listeners: RefCell<PathListeners<T>>,
    history: RefCell<TransitionHistory<S, T>>,
    control: Cell<ControlState>,
    in_flight: RefCell<Option<S>>,
    pending: RefCell<VecDeque<T>>,
}

impl<S, T, E> HierarchicalStateMachine<S, T, E>
where
    S: Clone + Debug + Eq + Hash,
    T: Clone + Debug + Eq + Hash,
{
    /// Machine comparing ids with their own `Eq` and `Hash`.
    pub fn new() -> Self {
        Self::with_comparers(Rc::new(NaturalEq), Rc::new(NaturalEq))
    }
}

impl<S, T, E> Default for HierarchicalStateMachine<S, T, E>
where
    S: Clone + Debug + Eq + Hash,
    T: Clone + Debug + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Debug, T: Clone + Debug, E> HierarchicalStateMachine<S, T, E> {
    pub fn with_comparers(states: SharedComparer<S>, triggers: SharedComparer<T>) -> Self {
        Self::with_options(states, triggers, MachineConfig::default())
    }

    /// Builds a machine with explicit comparers and configuration. The
    /// comparers are fixed for the lifetime of the machine.
    pub fn with_options(
        states: SharedComparer<S>,
        triggers: SharedComparer<T>,
        config: MachineConfig,
    ) -> Self {
        Self {
            hierarchy: RefCell::new(StateHierarchy::new(states.clone())),
            registry: RefCell::new(TransitionRegistry::new(states.clone(), triggers.clone())),
            validator: RefCell::new(TransitionValidator::new(states.clone(), triggers)),
            scheduler: RefCell::new(ActivePathScheduler::new(states.clone())),
            dispatcher: RefCell::new(EventDispatcher::new(states)),
            listeners: RefCell::new(PathListeners::new()),
            history: RefCell::new(TransitionHistory::with_limit(config.history_limit)),
            control: Cell::new(ControlState::Stopped),
            in_flight: RefCell::new(None),
            pending: RefCell::new(VecDeque::new()),
        }
    }

    // ---- control -------------------------------------------------------

    pub fn control_state(&self) -> ControlState {
        self.control.get()
    }

    pub fn is_started(&self) -> bool {
        self.control.get().is_started()
    }

    fn signal(&self, signal: ControlSignal) {
        self.control.set(self.control.get().on(signal));
    }

    fn ensure(&self, operation: Operation) -> Result<()> {
        self.control
            .get()
            .ensure(operation)
            .inspect_err(|error| debug!(?operation, %error, "operation rejected"))
    }

    fn ensure_known(&self, id: &S) -> Result<()> {
        if self.hierarchy.borrow().contains_state(id) {
            Ok(())
        } else {
            Err(MachineError::unknown(id))
        }
    }

    /// Why `id` may not be removed or re-parented right now, if it may not.
    fn protection_of(&self, id: &S) -> Option<&'static str> {
        if self.scheduler.borrow().is_in_state(id) {
            return Some("it is on the active hierarchy path");
        }
        let in_flight = self.in_flight.borrow();
        let target = in_flight.as_ref()?;
        let hierarchy = self.hierarchy.borrow();
        let pending_entry = hierarchy.equals(target, id)
            || hierarchy.is_ancestor_of(id, target)
            || hierarchy.are_parent_and_initial_descendant_at_any_level(target, id);
        pending_entry.then_some("it takes part in the path change in progress")
    }

    fn ensure_unprotected(&self, id: &S) -> Result<()> {
        match self.protection_of(id) {
            Some(reason) => {
                debug!(state = ?id, reason, "protected state");
                Err(MachineError::protected(id, reason))
            }
            None => Ok(()),
        }
    }

    // ---- states --------------------------------------------------------

    /// Registers a state. The first state added while no global initial
    /// state is set becomes the global initial state.
    pub fn add_state(&self, id: S, behavior: SharedBehavior) -> Result<()> {
        self.hierarchy.borrow_mut().add_state(id.clone(), behavior)?;
        trace!(state = ?id, "state added");
        Ok(())
    }

    /// Removes a state together with its child links, the transitions and
    /// guards that reference it, and its event handlers.
    ///
    /// Returns `Ok(false)` if the state was not registered.
    pub fn remove_state(&self, id: &S) -> Result<bool> {
        if !self.contains_state(id) {
            return Ok(false);
        }
        self.ensure(Operation::StructuralChange)?;
        self.ensure_unprotected(id)?;

        self.hierarchy.borrow_mut().remove_state(id);
        let transitions = self.registry.borrow_mut().remove_transitions_touching(id);
        {
            let mut validator = self.validator.borrow_mut();
            for transition in &transitions {
                validator.remove_all_guards_from(transition);
            }
        }
        let handlers = self.dispatcher.borrow_mut().remove_event_handlers_from(id);

        debug!(
            state = ?id,
            transitions = transitions.len(),
            handlers,
            "state removed"
        );
        Ok(true)
    }

    pub fn contains_state(&self, id: &S) -> bool {
        self.hierarchy.borrow().contains_state(id)
    }

    pub fn state_count(&self) -> usize {
        self.hierarchy.borrow().state_count()
    }

    /// All state ids, in registration order.
    pub fn states(&self) -> Vec<S> {
        self.hierarchy.borrow().states()
    }

    /// States without a parent. Empty when no state is registered.
    pub fn roots(&self) -> Vec<S> {
        self.hierarchy.borrow().roots()
    }

    pub fn behavior_of(&self, id: &S) -> Result<SharedBehavior> {
        self.hierarchy.borrow().behavior_of(id)
    }

    // ---- hierarchy -----------------------------------------------------

    /// Makes `child` an immediate child of `parent`.
    ///
    /// An identical existing relation is accepted as is. Relation errors
    /// (`SelfChild`, `ChildAlreadyHasParent`, `CyclicRelation`) are reported
    /// before the active-path checks: the child must not be active, and an
    /// active parent must already have children.
    pub fn add_child_to(&self, parent: &S, child: &S) -> Result<()> {
        if self
            .hierarchy
            .borrow()
            .are_immediate_parent_and_child(parent, child)
        {
            return Ok(());
        }
        self.ensure(Operation::StructuralChange)?;
        self.hierarchy.borrow().check_relation(parent, child)?;
        self.ensure_unprotected(child)?;

        let parent_is_active_leaf = self.is_in_state(parent)
            && self.hierarchy.borrow().child_count_of(parent)? == 0;
        if parent_is_active_leaf {
            return Err(MachineError::ActiveLeaf {
                parent: crate::error::render(parent),
                child: crate::error::render(child),
            });
        }

        self.hierarchy.borrow_mut().add_child_to(parent, child)?;
        trace!(parent = ?parent, child = ?child, "child added");
        Ok(())
    }

    /// Detaches `child` from its parent. Returns `Ok(false)` if it was
    /// already a root.
    pub fn remove_child_from_parent(&self, child: &S) -> Result<bool> {
        self.ensure_known(child)?;
        self.ensure(Operation::StructuralChange)?;
        self.ensure_unprotected(child)?;
        self.hierarchy.borrow_mut().remove_child_from_parent(child)
    }

    pub fn set_initial_state_to(&self, parent: &S, child: &S) -> Result<()> {
        self.hierarchy.borrow_mut().set_initial_state_to(parent, child)
    }

    pub fn initial_state_of(&self, parent: &S) -> Result<Option<S>> {
        self.hierarchy.borrow().initial_state_of(parent)
    }

    /// The state the next `start` descends from.
    pub fn initial_state(&self) -> Option<S> {
        self.hierarchy.borrow().initial_state().cloned()
    }

    pub fn set_initial_state(&self, id: &S) -> Result<()> {
        self.hierarchy.borrow_mut().set_initial_state(id)
    }

    pub fn immediate_children_of(&self, id: &S) -> Result<Vec<S>> {
        self.hierarchy.borrow().immediate_children_of(id)
    }

    pub fn child_count_of(&self, id: &S) -> Result<usize> {
        self.hierarchy.borrow().child_count_of(id)
    }

    /// Parent of `id`, or `id` itself for a root.
    pub fn parent_of(&self, id: &S) -> Result<S> {
        self.hierarchy.borrow().parent_of(id)
    }

    pub fn are_immediate_parent_and_child(&self, parent: &S, child: &S) -> bool {
        self.hierarchy
            .borrow()
            .are_immediate_parent_and_child(parent, child)
    }

    pub fn are_parent_and_initial_descendant_at_any_level(&self, ancestor: &S, id: &S) -> bool {
        self.hierarchy
            .borrow()
            .are_parent_and_initial_descendant_at_any_level(ancestor, id)
    }

    // ---- transitions and guards ----------------------------------------

    /// Registers a transition. Both endpoints must be registered states;
    /// adding an existing transition again has no effect.
    pub fn add_transition(&self, transition: Transition<S, T>) -> Result<()> {
        self.ensure_known(&transition.from)?;
        self.ensure_known(&transition.to)?;
        self.ensure(Operation::StructuralChange)?;
        trace!(?transition, "transition added");
        self.registry.borrow_mut().add_transition(transition);
        Ok(())
    }

    /// Removes a transition and its guards.
    pub fn remove_transition(&self, transition: &Transition<S, T>) -> Result<bool> {
        self.ensure(Operation::StructuralChange)?;
        let removed = self.registry.borrow_mut().remove_transition(transition);
        if removed {
            self.validator
                .borrow_mut()
                .remove_all_guards_from(transition);
        }
        Ok(removed)
    }

    pub fn contains_transition(&self, transition: &Transition<S, T>) -> bool {
        self.registry.borrow().contains_transition(transition)
    }

    pub fn transitions(&self) -> Vec<Transition<S, T>> {
        self.registry.borrow().transitions()
    }

    pub fn transition_count(&self) -> usize {
        self.registry.borrow().transition_count()
    }

    fn ensure_registered(&self, transition: &Transition<S, T>) -> Result<()> {
        if self.contains_transition(transition) {
            Ok(())
        } else {
            Err(MachineError::transition_not_registered(transition))
        }
    }

    pub fn add_guard_to(&self, transition: &Transition<S, T>, guard: SharedGuard) -> Result<()> {
        self.ensure_registered(transition)?;
        self.ensure(Operation::StructuralChange)?;
        self.validator.borrow_mut().add_guard_to(transition, guard);
        Ok(())
    }

    /// Removes one registration of `guard`.
    pub fn remove_guard_from(
        &self,
        transition: &Transition<S, T>,
        guard: &SharedGuard,
    ) -> Result<bool> {
        self.ensure_registered(transition)?;
        self.ensure(Operation::StructuralChange)?;
        Ok(self
            .validator
            .borrow_mut()
            .remove_guard_from(transition, guard))
    }

    pub fn contains_guard_on(
        &self,
        transition: &Transition<S, T>,
        guard: &SharedGuard,
    ) -> Result<bool> {
        self.ensure_registered(transition)?;
        Ok(self.validator.borrow().contains_guard_on(transition, guard))
    }

    pub fn guards_of(&self, transition: &Transition<S, T>) -> Result<Vec<SharedGuard>> {
        self.ensure_registered(transition)?;
        Ok(self.validator.borrow().guards_of(transition))
    }

    /// Whether every guard on `transition` accepts right now. Guards run in
    /// registration order on a snapshot, so they may call back into the
    /// machine.
    pub fn is_permitted(&self, transition: &Transition<S, T>) -> Result<bool> {
        let guards = self.guards_of(transition)?;
        Ok(all_accept(&guards))
    }

    // ---- event handlers ------------------------------------------------

    /// Subscribes `handler` to events delivered while `state` is active.
    pub fn add_event_handler_to(&self, state: &S, handler: SharedHandler<E>) -> Result<()> {
        self.ensure_known(state)?;
        self.dispatcher
            .borrow_mut()
            .add_event_handler_to(state, handler);
        Ok(())
    }

    pub fn remove_event_handler_from(&self, state: &S, handler: &SharedHandler<E>) -> bool {
        self.dispatcher
            .borrow_mut()
            .remove_event_handler_from(state, handler)
    }

    pub fn has_event_handler_on(&self, state: &S, handler: &SharedHandler<E>) -> bool {
        self.dispatcher.borrow().has_event_handler_on(state, handler)
    }

    pub fn event_handlers_of(&self, state: &S) -> Vec<SharedHandler<E>> {
        self.dispatcher.borrow().event_handlers_of(state)
    }

    // ---- observation ---------------------------------------------------

    /// Active states, root first. Empty while stopped.
    pub fn active_hierarchy_path(&self) -> Vec<S> {
        self.scheduler.borrow().active_hierarchy_path().to_vec()
    }

    pub fn is_in_state(&self, id: &S) -> bool {
        self.scheduler.borrow().is_in_state(id)
    }

    /// Called right before the first exit or enter of a path change.
    pub fn on_before_active_path_changes<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(Option<&T>) + 'static,
    {
        self.listeners
            .borrow_mut()
            .subscribe(PathEvent::BeforeChange, Rc::new(listener))
    }

    /// Called right after the last enter of a path change.
    pub fn on_active_path_changed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(Option<&T>) + 'static,
    {
        self.listeners
            .borrow_mut()
            .subscribe(PathEvent::Changed, Rc::new(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().unsubscribe(id)
    }

    fn notify(&self, event: PathEvent, trigger: Option<&T>) {
        let listeners = self.listeners.borrow().snapshot(event);
        for listener in listeners {
            listener(trigger);
        }
    }

    /// Executed transitions, oldest first.
    pub fn transition_history(&self) -> Vec<TransitionRecord<S, T>> {
        self.history.borrow().records().cloned().collect()
    }

    pub fn clear_transition_history(&self) {
        self.history.borrow_mut().clear();
    }

    // ---- lifecycle -----------------------------------------------------

    /// Enters the branch of the global initial state, root first, then
    /// descends through initial children.
    pub fn start(&self) -> Result<()> {
        self.ensure(Operation::Start)?;
        let mut change = {
            let hierarchy = self.hierarchy.borrow();
            self.scheduler.borrow().begin_enter(&hierarchy)?
        };
        *self.in_flight.borrow_mut() = self.initial_state();

        self.signal(ControlSignal::StartBegan);
        debug!("starting");
        self.notify(PathEvent::BeforeChange, None);
        match self.run_change(&mut change, true) {
            Ok(true) => {}
            Ok(false) => {
                debug!("start abandoned by stop");
                return Ok(());
            }
            Err(error) => {
                self.abort();
                return Err(error);
            }
        }
        self.notify(PathEvent::Changed, None);
        *self.in_flight.borrow_mut() = None;
        self.signal(ControlSignal::StartFinished);
        debug!(path = ?self.active_hierarchy_path(), "started");

        self.drain_pending()
    }

    /// Exits every active state, leaf first. Stopping a stopped or stopping
    /// machine does nothing.
    ///
    /// Called from a behavior, guard or listener while a start descent or
    /// transition runs, `stop` exits the states entered so far. The rest of
    /// that path change is dropped, together with any queued triggers.
    pub fn stop(&self) -> Result<()> {
        if matches!(
            self.control.get(),
            ControlState::Stopped | ControlState::Stopping
        ) {
            return Ok(());
        }
        self.ensure(Operation::Stop)?;

        self.signal(ControlSignal::StopBegan);
        debug!("stopping");
        let mut change = self.scheduler.borrow().begin_exit_all();
        let result = self.run_change(&mut change, false).map(|_| ());
        self.scheduler.borrow_mut().clear();
        self.pending.borrow_mut().clear();
        *self.in_flight.borrow_mut() = None;
        self.signal(ControlSignal::ExitDone);
        debug!(exited = ?change.exited(), "stopped");
        result
    }

    /// Calls `update` on every active state, root first.
    pub fn update(&self) -> Result<()> {
        self.ensure(Operation::Tick)?;
        let active = {
            let hierarchy = self.hierarchy.borrow();
            self.scheduler.borrow().active_behaviors(&hierarchy)
        };
        for (state, behavior) in active {
            if !self.is_in_state(&state) {
                continue;
            }
            trace!(state = ?state, "update");
            behavior.update();
        }
        Ok(())
    }

    /// Fires `trigger`: the first permitted transition declared on an
    /// active state executes, preferring states closer to the leaf.
    ///
    /// A trigger fired while a transition is being evaluated or executed
    /// is queued and evaluated after it, before this call returns to the
    /// outermost caller.
    pub fn trigger(&self, trigger: T) -> Result<()> {
        self.ensure(Operation::Trigger)?;
        if self.control.get() != ControlState::Idle {
            debug!(?trigger, state = %self.control.get(), "trigger deferred");
            self.pending.borrow_mut().push_back(trigger);
            return Ok(());
        }
        self.evaluate(trigger)?;
        self.drain_pending()
    }

    /// Delivers `event` from the active leaf towards the root. Returns
    /// `true` as soon as a handler reports it handled.
    pub fn send_event(&self, event: &E) -> Result<bool> {
        self.ensure(Operation::Tick)?;
        let path = self.active_hierarchy_path();
        for state in path.iter().rev() {
            if !self.is_in_state(state) {
                continue;
            }
            let handlers = self.dispatcher.borrow().event_handlers_of(state);
            for handler in handlers {
                if handler.handle(event) {
                    trace!(state = ?state, "event handled");
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn drain_pending(&self) -> Result<()> {
        while self.control.get() == ControlState::Idle {
            let next = self.pending.borrow_mut().pop_front();
            let Some(trigger) = next else {
                break;
            };
            self.evaluate(trigger)?;
        }
        Ok(())
    }

    fn evaluate(&self, trigger: T) -> Result<()> {
        self.signal(ControlSignal::EvaluationBegan);
        match self.select_and_execute(&trigger) {
            Ok(()) => {
                self.signal(ControlSignal::EvaluationFinished);
                Ok(())
            }
            Err(error) => {
                self.abort();
                Err(error)
            }
        }
    }

    fn select_and_execute(&self, trigger: &T) -> Result<()> {
        let candidates = {
            let sources: Vec<S> = self
                .scheduler
                .borrow()
                .active_hierarchy_path()
                .iter()
                .rev()
                .cloned()
                .collect();
            self.registry.borrow().candidates(&sources, trigger)
        };

        for candidate in candidates {
            let permitted = self.is_permitted(&candidate)?;
            if self.stop_requested() {
                debug!(?trigger, "evaluation abandoned by stop");
                return Ok(());
            }
            if permitted {
                debug!(transition = ?candidate, "transition selected");
                return self.execute(candidate);
            }
            trace!(transition = ?candidate, "guard rejected transition");
        }
        debug!(?trigger, "no permitted transition");
        Ok(())
    }

    fn execute(&self, transition: Transition<S, T>) -> Result<()> {
        let mut change = {
            let hierarchy = self.hierarchy.borrow();
            self.scheduler
                .borrow()
                .begin_transition(&transition.to, &hierarchy)?
        };
        *self.in_flight.borrow_mut() = Some(transition.to.clone());

        self.signal(ControlSignal::PathChangeBegan);
        self.notify(PathEvent::BeforeChange, Some(&transition.trigger));
        if !self.run_change(&mut change, true)? {
            debug!(?transition, "transition abandoned by stop");
            return Ok(());
        }
        self.notify(PathEvent::Changed, Some(&transition.trigger));

        let (exited, entered) = change.into_parts();
        debug!(?transition, ?exited, ?entered, "transition finished");
        self.history.borrow_mut().record(TransitionRecord {
            transition,
            exited,
            entered,
            timestamp: Utc::now(),
        });
        *self.in_flight.borrow_mut() = None;
        self.signal(ControlSignal::TransitionFinished);
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        matches!(
            self.control.get(),
            ControlState::Stopping | ControlState::Stopped
        )
    }

    /// Runs `change` to completion. Returns `Ok(false)` if an interruptible
    /// change was cut short by a nested `stop`.
    fn run_change(&self, change: &mut PathChange<S>, interruptible: bool) -> Result<bool> {
        loop {
            if interruptible && self.stop_requested() {
                return Ok(false);
            }
            let step = {
                let hierarchy = self.hierarchy.borrow();
                self.scheduler.borrow_mut().advance(change, &hierarchy)?
            };
            let Some(step) = step else {
                return Ok(true);
            };
            trace!(?step, "lifecycle call");
            step.run();
        }
    }

    /// Returns to a consistent control state after a failed path change.
    fn abort(&self) {
        *self.in_flight.borrow_mut() = None;
        self.pending.borrow_mut().clear();
        let settled = if self.scheduler.borrow().is_empty() {
            ControlState::Stopped
        } else {
            ControlState::Idle
        };
        self.control.set(settled);
    }
}
