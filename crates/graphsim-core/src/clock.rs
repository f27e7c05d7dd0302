//! Simulated calendar.
//!
//! The date is a pure function of the iteration number: iteration N is
//! midnight on 1 January of year N. Wall-clock time is never consulted, so a
//! rerun with the same iteration always sees the same date.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Iteration counter would overflow.
    #[error("iteration counter overflow: cannot advance beyond u64::MAX")]
    IterationOverflow,

    /// The iteration is past the last year chrono can represent.
    #[error("iteration {iteration} has no calendar date")]
    DateOutOfRange {
        /// The offending iteration.
        iteration: u64,
    },
}

/// Tracks the 1-based iteration number and derives the simulated date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationClock {
    iteration: u64,
}

impl SimulationClock {
    /// A clock at iteration 1.
    pub const fn new() -> Self {
        Self { iteration: 1 }
    }

    /// A clock at an explicit iteration (used for restarts and tests).
    pub const fn at(iteration: u64) -> Self {
        Self { iteration }
    }

    /// The iteration about to run.
    pub const fn iteration(self) -> u64 {
        self.iteration
    }

    /// Simulated date of the current iteration.
    pub fn today(self) -> Result<NaiveDateTime, ClockError> {
        date_of(self.iteration)
    }

    /// Move to the next iteration. Returns the new iteration number.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.iteration = self
            .iteration
            .checked_add(1)
            .ok_or(ClockError::IterationOverflow)?;
        Ok(self.iteration)
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Midnight on 1 January of year `iteration`.
pub fn date_of(iteration: u64) -> Result<NaiveDateTime, ClockError> {
    let year =
        i32::try_from(iteration).map_err(|_err| ClockError::DateOutOfRange { iteration })?;
    NaiveDate::from_yo_opt(year, 1)
        .map(|date| date.and_time(NaiveTime::MIN))
        .ok_or(ClockError::DateOutOfRange { iteration })
}
