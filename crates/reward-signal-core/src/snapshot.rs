//! Per-step observation snapshots

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::{Result, SignalError};

/// Identifier of an agent inside a brain
pub type AgentId = u64;

/// Batch of agent observations for one brain at one environment step.
///
/// Row `i` of every per-agent field belongs to `agents[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStepSnapshot")]
pub struct StepSnapshot {
    /// Agent identifiers
    pub agents: Vec<AgentId>,
    /// Vector observations, one row per agent
    pub vector_observations: Array2<f32>,
    /// Environment reward received on arrival at this step
    pub rewards: Vec<f32>,
    /// Whether each agent's episode ended at this step
    pub local_done: Vec<bool>,
    /// Whether each agent ended because of the step limit
    pub max_reached: Vec<bool>,
    /// Action each agent took to arrive at this step
    pub previous_vector_actions: Array2<f32>,
}

impl StepSnapshot {
    /// Create a snapshot, checking that every per-agent field has one entry
    /// per agent.
    pub fn new(
        agents: Vec<AgentId>,
        vector_observations: Array2<f32>,
        rewards: Vec<f32>,
        local_done: Vec<bool>,
        previous_vector_actions: Array2<f32>,
    ) -> Result<Self> {
        let snapshot = Self {
            max_reached: vec![false; agents.len()],
            agents,
            vector_observations,
            rewards,
            local_done,
            previous_vector_actions,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check that every per-agent field has one entry per agent
    pub fn validate(&self) -> Result<()> {
        let n = self.agents.len();
        for actual in [
            self.vector_observations.nrows(),
            self.rewards.len(),
            self.local_done.len(),
            self.max_reached.len(),
            self.previous_vector_actions.nrows(),
        ] {
            if actual != n {
                return Err(SignalError::DimensionMismatch { expected: n, actual });
            }
        }
        Ok(())
    }

    /// Snapshot with no agents
    #[must_use]
    pub fn empty(observation_size: usize, action_size: usize) -> Self {
        Self {
            agents: Vec::new(),
            vector_observations: Array2::zeros((0, observation_size)),
            rewards: Vec::new(),
            local_done: Vec::new(),
            max_reached: Vec::new(),
            previous_vector_actions: Array2::zeros((0, action_size)),
        }
    }

    /// Number of agents in the snapshot
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Check if the snapshot has no agents
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Row index of an agent, if present
    #[must_use]
    pub fn index_of(&self, agent: AgentId) -> Option<usize> {
        self.agents.iter().position(|&a| a == agent)
    }

    /// Observation row of the agent at `index`
    #[must_use]
    pub fn observation(&self, index: usize) -> ArrayView1<'_, f32> {
        self.vector_observations.row(index)
    }
}

/// Wire form of [`StepSnapshot`], checked before use
#[derive(Deserialize)]
struct RawStepSnapshot {
    agents: Vec<AgentId>,
    vector_observations: Array2<f32>,
    rewards: Vec<f32>,
    local_done: Vec<bool>,
    #[serde(default)]
    max_reached: Vec<bool>,
    previous_vector_actions: Array2<f32>,
}

impl TryFrom<RawStepSnapshot> for StepSnapshot {
    type Error = SignalError;

    fn try_from(raw: RawStepSnapshot) -> Result<Self> {
        let mut snapshot = Self::new(
            raw.agents,
            raw.vector_observations,
            raw.rewards,
            raw.local_done,
            raw.previous_vector_actions,
        )?;
        if !raw.max_reached.is_empty() {
            snapshot.max_reached = raw.max_reached;
            snapshot.validate()?;
        }
        Ok(snapshot)
    }
}
