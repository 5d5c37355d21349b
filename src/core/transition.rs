//! Transition value type.

use super::comparer::IdComparer;
use serde::{Deserialize, Serialize};

/// A rule moving the active path from `from` to `to` when `trigger` fires.
///
/// Transitions are plain values. Inside the machine two transitions are the
/// same when all three fields match under the configured comparers.
///
/// # Example
///
/// ```rust
/// use arbor_hsm::core::Transition;
///
/// let transitions: Vec<Transition<String, String>> = serde_json::from_str(
///     r#"[{ "from": "idle", "trigger": "go", "to": "running" }]"#,
/// )
/// .unwrap();
///
/// assert_eq!(transitions[0], Transition::new("idle".into(), "go".into(), "running".into()));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition<S, T> {
    pub from: S,
    pub trigger: T,
    pub to: S,
}

impl<S, T> Transition<S, T> {
    pub fn new(from: S, trigger: T, to: S) -> Self {
        Self { from, trigger, to }
    }

    /// Field-wise equality through the machine's comparers.
    pub fn matches(
        &self,
        other: &Self,
        states: &dyn IdComparer<S>,
        triggers: &dyn IdComparer<T>,
    ) -> bool {
        states.equals(&self.from, &other.from)
            && triggers.equals(&self.trigger, &other.trigger)
            && states.equals(&self.to, &other.to)
    }

    /// Whether either endpoint is `state`.
    pub fn touches(&self, state: &S, states: &dyn IdComparer<S>) -> bool {
        states.equals(&self.from, state) || states.equals(&self.to, state)
    }
}
