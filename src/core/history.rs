//! Record of executed transitions.
//!
//! The machine appends one [`TransitionRecord`] per executed transition,
//! keeping only the most recent entries up to a configured limit.

use super::transition::Transition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// One executed transition together with the path delta it produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord<S, T> {
    pub transition: Transition<S, T>,
    /// States exited, leaf first.
    pub exited: Vec<S>,
    /// States entered, root first.
    pub entered: Vec<S>,
    pub timestamp: DateTime<Utc>,
}

/// Bounded, oldest-first history of executed transitions.
///
/// # Example
///
/// ```rust
/// use arbor_hsm::core::{Transition, TransitionHistory, TransitionRecord};
/// use chrono::Utc;
///
/// let mut history = TransitionHistory::with_limit(2);
/// for to in ["b", "c", "d"] {
///     history.record(TransitionRecord {
///         transition: Transition::new("a", "next", to),
///         exited: vec!["a"],
///         entered: vec![to],
///         timestamp: Utc::now(),
///     });
/// }
///
/// let targets: Vec<_> = history.records().map(|r| r.transition.to).collect();
/// assert_eq!(targets, vec!["c", "d"]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionHistory<S, T> {
    limit: usize,
    records: VecDeque<TransitionRecord<S, T>>,
}

impl<S, T> TransitionHistory<S, T> {
    /// A limit of zero disables recording.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            records: VecDeque::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn record(&mut self, record: TransitionRecord<S, T>) {
        if self.limit == 0 {
            return;
        }
        while self.records.len() >= self.limit {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn records(&self) -> impl Iterator<Item = &TransitionRecord<S, T>> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&TransitionRecord<S, T>> {
        self.records.back()
    }

    /// Time between the oldest and newest retained record.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.front()?, self.records.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
