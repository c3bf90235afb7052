//! Environment reward passed through as a signal

use ndarray::Array1;
use std::sync::Arc;

use reward_signal_core::prelude::*;
use reward_signal_core::{parse_settings, SignalSettings};

use crate::transition::MatchedAgents;

/// Reward signal reporting the environment's own reward
#[derive(Debug, Clone)]
pub struct ExtrinsicRewardSignal {
    params: SignalParams,
}

impl ExtrinsicRewardSignal {
    /// Create an extrinsic signal
    pub fn new(policy: Arc<dyn Policy>, strength: f32, gamma: f32) -> Result<Self> {
        Ok(Self {
            params: SignalParams::new(policy, strength, gamma)?,
        })
    }
}

impl RewardSignal for ExtrinsicRewardSignal {
    fn name(&self) -> &str {
        "Extrinsic"
    }

    fn params(&self) -> &SignalParams {
        &self.params
    }

    fn evaluate(&self, current: &StepSnapshot, next: &StepSnapshot) -> Result<SignalOutput> {
        let matched = MatchedAgents::between(current, next)?;
        let mut unscaled = Array1::zeros(current.len());
        for (&i, &j) in matched.current.iter().zip(&matched.next) {
            unscaled[i] = next.rewards[j];
        }
        Ok(SignalOutput::from_unscaled(unscaled, self.strength()))
    }
}

impl FromSignalConfig for ExtrinsicRewardSignal {
    const TYPE_NAME: &'static str = "ExtrinsicRewardSignal";
    const REQUIRED_KEYS: &'static [&'static str] = &["strength", "gamma"];

    fn from_config(policy: Arc<dyn Policy>, config: &SignalConfig) -> Result<Self> {
        let settings: SignalSettings = parse_settings(config)?;
        Ok(Self {
            params: SignalParams::from_settings(policy, settings)?,
        })
    }
}
