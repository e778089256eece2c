use serde::Serialize;
use std::collections::VecDeque;
use std::fmt::{Debug, Display};
use thiserror::Error;

/// End-of-run failures of a [`Scoreboard`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerdictError {
    #[error("{mismatches} result(s) did not match the expected value ({unconsumed} expected value(s) never observed)")]
    Mismatches { mismatches: u32, unconsumed: usize },
    #[error("{0} expected value(s) were never observed")]
    Unconsumed(usize),
}

/// What [`Scoreboard::observe`] made of one actual value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Pass,
    Mismatch { expected: T, actual: T },
    /// Nothing was expected.
    Unexpected,
}

/// Counters of a scoreboard at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreboardSummary {
    pub expected: u32,
    pub passes: u32,
    pub mismatches: u32,
    pub underflows: u32,
    pub pending: usize,
}

/// Ordered comparison of expected against observed results.
#[derive(Debug, Clone)]
pub struct Scoreboard<T = u64> {
    queue: VecDeque<T>,
    expected: u32,
    passes: u32,
    mismatches: u32,
    underflows: u32,
}

impl<T> Default for Scoreboard<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            expected: 0,
            passes: 0,
            mismatches: 0,
            underflows: 0,
        }
    }
}

impl<T> Scoreboard<T>
where
    T: PartialEq + Clone + Display + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_expected(&mut self, value: T) {
        self.queue.push_back(value);
        self.expected += 1;
    }

    /// Compares `actual` with the oldest expected value.
    pub fn observe(&mut self, actual: T) -> Outcome<T> {
        let Some(expected) = self.queue.pop_front() else {
            self.underflows += 1;
            log::warn!("unexpected output {actual}: no expected value pending");
            return Outcome::Unexpected;
        };
        if expected == actual {
            self.passes += 1;
            log::info!("expected: {expected}, actual: {actual} -> ok");
            Outcome::Pass
        } else {
            self.mismatches += 1;
            log::error!("expected: {expected}, actual: {actual} -> mismatch");
            Outcome::Mismatch { expected, actual }
        }
    }

    /// Expected values not yet observed, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &T> {
        self.queue.iter()
    }

    pub fn mismatches(&self) -> u32 {
        self.mismatches
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn underflows(&self) -> u32 {
        self.underflows
    }

    pub fn summary(&self) -> ScoreboardSummary {
        ScoreboardSummary {
            expected: self.expected,
            passes: self.passes,
            mismatches: self.mismatches,
            underflows: self.underflows,
            pending: self.queue.len(),
        }
    }

    /// End-of-run verdict. Mismatches are reported before unconsumed
    /// entries.
    pub fn check(&self) -> Result<ScoreboardSummary, VerdictError> {
        let unconsumed = self.queue.len();
        if self.mismatches > 0 {
            return Err(VerdictError::Mismatches {
                mismatches: self.mismatches,
                unconsumed,
            });
        }
        if unconsumed > 0 {
            log::error!(
                "unconsumed expected values: {:?}",
                self.queue.iter().collect::<Vec<_>>()
            );
            return Err(VerdictError::Unconsumed(unconsumed));
        }
        Ok(self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pass_and_mismatch_are_counted() {
        let mut sb = Scoreboard::new();
        sb.push_expected(1u64);
        sb.push_expected(0);
        assert_eq!(sb.observe(1), Outcome::Pass);
        assert_eq!(
            sb.observe(1),
            Outcome::Mismatch {
                expected: 0,
                actual: 1
            }
        );
        assert_eq!(sb.passes(), 1);
        assert_eq!(
            sb.check(),
            Err(VerdictError::Mismatches {
                mismatches: 1,
                unconsumed: 0
            })
        );
    }

    #[test]
    fn underflow_is_not_fatal() {
        let mut sb: Scoreboard = Scoreboard::new();
        assert_eq!(sb.observe(7), Outcome::Unexpected);
        assert_eq!(sb.underflows(), 1);
        assert_eq!(sb.mismatches(), 0);
        assert!(sb.check().is_ok());
    }

    #[test]
    fn leftover_expectation_fails() {
        let mut sb: Scoreboard = Scoreboard::new();
        sb.push_expected(1);
        assert_eq!(sb.check(), Err(VerdictError::Unconsumed(1)));
        assert_eq!(sb.pending().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn mismatches_reported_before_unconsumed() {
        let mut sb: Scoreboard = Scoreboard::new();
        sb.push_expected(1);
        sb.push_expected(1);
        sb.observe(0);
        assert!(matches!(
            sb.check(),
            Err(VerdictError::Mismatches {
                mismatches: 1,
                unconsumed: 1
            })
        ));
    }

    proptest! {
        #[test]
        fn matching_streams_always_pass(values in proptest::collection::vec(0u64..4, 0..64)) {
            let mut sb = Scoreboard::new();
            for v in &values {
                sb.push_expected(*v);
            }
            for v in &values {
                prop_assert_eq!(sb.observe(*v), Outcome::Pass);
            }
            let summary = sb.check().unwrap();
            prop_assert_eq!(summary.passes as usize, values.len());
            prop_assert_eq!(summary.pending, 0);
        }

        #[test]
        fn every_observation_is_accounted(
            expected in proptest::collection::vec(0u64..2, 0..32),
            actual in proptest::collection::vec(0u64..2, 0..32),
        ) {
            let mut sb = Scoreboard::new();
            for v in &expected {
                sb.push_expected(*v);
            }
            for v in &actual {
                sb.observe(*v);
            }
            let s = sb.summary();
            prop_assert_eq!((s.passes + s.mismatches + s.underflows) as usize, actual.len());
            prop_assert_eq!(s.pending, expected.len().saturating_sub(actual.len()));
        }
    }
}
