//! The policy side of a reward signal
//!
//! A reward signal never drives the policy. It only needs to know the shape of
//! the brain the policy controls, so it can size its own models and encode the
//! actions it finds in snapshots and buffers.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::{Result, SignalError};

/// Kind of action space a brain exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSpaceType {
    /// One integer choice per branch
    Discrete,
    /// A real-valued vector
    Continuous,
}

/// Static description of the brain a policy controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainParameters {
    /// Brain name, used in log labels
    pub brain_name: String,
    /// Length of a single vector observation
    pub vector_observation_size: usize,
    /// Branch sizes for discrete spaces, or a single entry holding the
    /// dimension for continuous spaces
    pub vector_action_space_size: Vec<usize>,
    /// Action space kind
    pub vector_action_space_type: ActionSpaceType,
}

impl BrainParameters {
    /// Create parameters for a discrete brain
    pub fn discrete(
        brain_name: impl Into<String>,
        vector_observation_size: usize,
        branches: Vec<usize>,
    ) -> Self {
        Self {
            brain_name: brain_name.into(),
            vector_observation_size,
            vector_action_space_size: branches,
            vector_action_space_type: ActionSpaceType::Discrete,
        }
    }

    /// Create parameters for a continuous brain
    pub fn continuous(
        brain_name: impl Into<String>,
        vector_observation_size: usize,
        action_dim: usize,
    ) -> Self {
        Self {
            brain_name: brain_name.into(),
            vector_observation_size,
            vector_action_space_size: vec![action_dim],
            vector_action_space_type: ActionSpaceType::Continuous,
        }
    }

    /// Width of an action row as stored in snapshots and buffers
    #[must_use]
    pub fn raw_action_size(&self) -> usize {
        match self.vector_action_space_type {
            ActionSpaceType::Discrete => self.vector_action_space_size.len(),
            ActionSpaceType::Continuous => self.vector_action_space_size.iter().sum(),
        }
    }

    /// Width of an action row after [`Self::encode_actions`]
    #[must_use]
    pub fn encoded_action_size(&self) -> usize {
        self.vector_action_space_size.iter().sum()
    }

    /// Encode raw action rows for model input.
    ///
    /// Discrete branches become concatenated one-hot vectors; continuous
    /// actions are copied unchanged.
    pub fn encode_actions(&self, actions: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        let raw = self.raw_action_size();
        if actions.ncols() != raw {
            return Err(SignalError::DimensionMismatch {
                expected: raw,
                actual: actions.ncols(),
            });
        }

        match self.vector_action_space_type {
            ActionSpaceType::Continuous => Ok(actions.to_owned()),
            ActionSpaceType::Discrete => {
                let mut encoded = Array2::zeros((actions.nrows(), self.encoded_action_size()));
                for (row, action) in actions.outer_iter().enumerate() {
                    let mut offset = 0;
                    for (branch, &size) in self.vector_action_space_size.iter().enumerate() {
                        // Out-of-range choices encode as all zeros for that branch.
                        let choice = action[branch];
                        if choice >= 0.0 && (choice as usize) < size {
                            encoded[[row, offset + choice as usize]] = 1.0;
                        }
                        offset += size;
                    }
                }
                Ok(encoded)
            }
        }
    }
}

/// The policy a reward signal is attached to.
///
/// Signals hold an `Arc<dyn Policy>` and only read from it.
pub trait Policy: Send + Sync {
    /// Shape of the brain this policy controls
    fn brain(&self) -> &BrainParameters;

    /// Number of consecutive steps that form one training sequence
    fn sequence_length(&self) -> usize {
        1
    }
}

impl Policy for BrainParameters {
    fn brain(&self) -> &BrainParameters {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_discrete_actions_one_hot_per_branch() {
        let brain = BrainParameters::discrete("walker", 4, vec![3, 2]);
        let actions = array![[2.0_f32, 0.0], [0.0, 1.0]];

        let encoded = brain.encode_actions(actions.view()).unwrap();

        assert_eq!(encoded.dim(), (2, 5));
        assert_eq!(encoded.row(0).to_vec(), vec![0.0, 0.0, 1.0, 1.0, 0.0]);
        assert_eq!(encoded.row(1).to_vec(), vec![1.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_continuous_actions_pass_through() {
        let brain = BrainParameters::continuous("reacher", 8, 2);
        let actions = array![[0.5_f32, -0.25]];

        let encoded = brain.encode_actions(actions.view()).unwrap();
        assert_eq!(encoded, actions);
    }

    #[test]
    fn test_action_width_mismatch() {
        let brain = BrainParameters::discrete("walker", 4, vec![3, 2]);
        let actions = array![[1.0_f32]];

        let err = brain.encode_actions(actions.view()).unwrap_err();
        assert!(matches!(
            err,
            SignalError::DimensionMismatch { expected: 2, actual: 1 }
        ));
    }
}
