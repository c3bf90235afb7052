//! Reward signal outputs and discounting

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Rewards a signal produced for one step, one entry per agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalOutput {
    /// Reward after the signal's strength (and any clipping) is applied
    pub scaled_reward: Array1<f32>,
    /// Raw reward, comparable across signals
    pub unscaled_reward: Array1<f32>,
}

impl SignalOutput {
    /// Neutral output for `num_agents` agents
    #[must_use]
    pub fn zeros(num_agents: usize) -> Self {
        Self {
            scaled_reward: Array1::zeros(num_agents),
            unscaled_reward: Array1::zeros(num_agents),
        }
    }

    /// Output whose scaled part is `strength` times the raw reward
    #[must_use]
    pub fn from_unscaled(unscaled_reward: Array1<f32>, strength: f32) -> Self {
        Self {
            scaled_reward: &unscaled_reward * strength,
            unscaled_reward,
        }
    }

    /// Number of agents covered
    #[must_use]
    pub fn len(&self) -> usize {
        self.unscaled_reward.len()
    }

    /// Check if the output covers no agents
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unscaled_reward.is_empty()
    }
}

/// Compute discounted returns, bootstrapping from `value_next` after the last
/// reward
#[must_use]
pub fn discount_rewards(rewards: &[f32], gamma: f32, value_next: f32) -> Vec<f32> {
    let mut returns: Vec<f32> = rewards
        .iter()
        .rev()
        .scan(value_next, |acc, &reward| {
            *acc = reward + gamma * *acc;
            Some(*acc)
        })
        .collect();
    returns.reverse();
    returns
}
