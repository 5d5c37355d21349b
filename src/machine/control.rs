//! Engine-wide control state guarding re-entrant calls.

use crate::error::{MachineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the machine is doing right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlState {
    /// Not started; no state is active.
    Stopped,

    /// Exiting the active path inside `stop`. A stop requested while a path
    /// change runs abandons the rest of that change.
    Stopping,

    /// Started and waiting for input.
    Idle,

    /// Inside `trigger`, looking for a permitted transition.
    EvaluatingTransitions,

    /// Exiting and entering states for a start descent or a transition.
    Transitioning,
}

/// Internal notifications that drive the control state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ControlSignal {
    StartBegan,
    StartFinished,
    EvaluationBegan,
    PathChangeBegan,
    TransitionFinished,
    EvaluationFinished,
    StopBegan,
    ExitDone,
}

/// Public operations whose legality depends on the control state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Operation {
    Start,
    Stop,
    Trigger,
    Tick,
    StructuralChange,
}

impl ControlState {
    pub fn is_started(self) -> bool {
        self != ControlState::Stopped
    }

    /// Next control state after `signal`. Signals that do not apply in the
    /// current state leave it unchanged.
    pub(crate) fn on(self, signal: ControlSignal) -> ControlState {
        use ControlSignal::*;
        use ControlState::*;

        match (self, signal) {
            (Stopped, StartBegan) => Transitioning,
            (Transitioning, StartFinished) => Idle,
            (Idle, EvaluationBegan) => EvaluatingTransitions,
            (EvaluatingTransitions, PathChangeBegan) => Transitioning,
            (Transitioning, TransitionFinished) => EvaluatingTransitions,
            (EvaluatingTransitions, EvaluationFinished) => Idle,
            (Idle | EvaluatingTransitions | Transitioning, StopBegan) => Stopping,
            (Stopping, ExitDone) => Stopped,
            (current, _) => current,
        }
    }

    pub(crate) fn permits(self, operation: Operation) -> bool {
        use ControlState::*;

        match operation {
            Operation::Start => self == Stopped,
            Operation::Stop => matches!(self, Idle | EvaluatingTransitions | Transitioning),
            Operation::Trigger => matches!(self, Idle | EvaluatingTransitions | Transitioning),
            Operation::Tick => self != Stopped,
            Operation::StructuralChange => self != EvaluatingTransitions,
        }
    }

    pub(crate) fn ensure(self, operation: Operation) -> Result<()> {
        if self.permits(operation) {
            Ok(())
        } else {
            Err(MachineError::InvalidControlState(self))
        }
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlState::Stopped => "stopped",
            ControlState::Stopping => "stopping",
            ControlState::Idle => "idle",
            ControlState::EvaluatingTransitions => "evaluating transitions",
            ControlState::Transitioning => "transitioning",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ControlSignal::*;
    use ControlState::*;

    #[test]
    fn start_passes_through_transitioning() {
        let state = Stopped.on(StartBegan);
        assert_eq!(state, Transitioning);
        assert_eq!(state.on(StartFinished), Idle);
    }

    #[test]
    fn trigger_cycle_returns_to_idle() {
        let states: Vec<ControlState> = [
            EvaluationBegan,
            PathChangeBegan,
            TransitionFinished,
            EvaluationFinished,
        ]
        .into_iter()
        .scan(Idle, |state, signal| {
            *state = state.on(signal);
            Some(*state)
        })
        .collect();

        assert_eq!(
            states,
            vec![EvaluatingTransitions, Transitioning, EvaluatingTransitions, Idle]
        );
    }

    #[test]
    fn stop_goes_through_stopping() {
        assert_eq!(Idle.on(StopBegan), Stopping);
        assert_eq!(Stopping.on(ExitDone), Stopped);
        assert_eq!(Stopped.on(StopBegan), Stopped);
    }

    #[test]
    fn unrelated_signals_are_ignored() {
        assert_eq!(Idle.on(PathChangeBegan), Idle);
        assert_eq!(Stopped.on(EvaluationBegan), Stopped);
    }

    #[test]
    fn permissions_follow_the_control_state() {
        assert!(Stopped.permits(Operation::Start));
        assert!(!Idle.permits(Operation::Start));

        assert!(Transitioning.permits(Operation::Trigger));
        assert!(!Stopping.permits(Operation::Trigger));
        assert!(!Stopped.permits(Operation::Trigger));

        assert!(!EvaluatingTransitions.permits(Operation::StructuralChange));
        assert!(Transitioning.permits(Operation::StructuralChange));

        assert!(!Stopped.permits(Operation::Tick));
        assert!(Stopping.permits(Operation::Tick));
    }

    #[test]
    fn stop_is_permitted_from_every_running_state() {
        for state in [Idle, EvaluatingTransitions, Transitioning] {
            assert!(state.permits(Operation::Stop), "{state}");
            assert_eq!(state.on(StopBegan), Stopping);
        }
        assert!(!Stopped.permits(Operation::Stop));
        assert!(!Stopping.permits(Operation::Stop));
    }

    #[test]
    fn signals_after_a_nested_stop_keep_the_machine_stopped() {
        for signal in [StartFinished, TransitionFinished, EvaluationFinished] {
            assert_eq!(Stopped.on(signal), Stopped);
        }
    }

    #[test]
    fn ensure_reports_the_offending_state() {
        assert_eq!(
            Stopping.ensure(Operation::Trigger),
            Err(MachineError::InvalidControlState(Stopping))
        );
        assert!(Idle.ensure(Operation::Tick).is_ok());
    }
}
