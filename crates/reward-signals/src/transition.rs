//! Pairing agents across consecutive snapshots

use ndarray::{Array2, Axis};

use reward_signal_core::{Result, SignalError, StepSnapshot};

/// Rows of the agents of `current` that are still present in `next`
#[derive(Debug, Clone, Default)]
pub(crate) struct MatchedAgents {
    /// Row in `current`
    pub current: Vec<usize>,
    /// Row of the same agent in `next`
    pub next: Vec<usize>,
}

impl MatchedAgents {
    /// Pair agents by id. Both snapshots must be internally consistent.
    pub(crate) fn between(current: &StepSnapshot, next: &StepSnapshot) -> Result<Self> {
        current.validate()?;
        next.validate()?;
        let mut matched = Self::default();
        for (i, &agent) in current.agents.iter().enumerate() {
            if let Some(j) = next.index_of(agent) {
                matched.current.push(i);
                matched.next.push(j);
            }
        }
        Ok(matched)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Observations of the matched agents at `current`
    pub(crate) fn observations(&self, current: &StepSnapshot) -> Array2<f32> {
        current.vector_observations.select(Axis(0), &self.current)
    }

    /// Observations of the matched agents at `next`
    pub(crate) fn next_observations(&self, next: &StepSnapshot) -> Array2<f32> {
        next.vector_observations.select(Axis(0), &self.next)
    }

    /// Actions the matched agents took between the two snapshots
    pub(crate) fn actions(&self, next: &StepSnapshot) -> Array2<f32> {
        next.previous_vector_actions.select(Axis(0), &self.next)
    }
}

/// Check that a batch of observations has the width the brain declares
pub(crate) fn check_width(observations: &Array2<f32>, expected: usize) -> Result<()> {
    if observations.ncols() == expected {
        Ok(())
    } else {
        Err(SignalError::DimensionMismatch {
            expected,
            actual: observations.ncols(),
        })
    }
}
