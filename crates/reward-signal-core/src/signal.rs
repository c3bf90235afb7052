//! The reward signal contract

use indexmap::IndexMap;
use ndarray::Array1;
use std::fmt;
use std::sync::Arc;

use crate::config::{parse_settings, SignalConfig, SignalSettings};
use crate::{AgentBuffer, Policy, Result, SignalError, SignalOutput, StepSnapshot};

/// Named scalars produced by an update, e.g. `"Losses/Curiosity Forward Loss"`
pub type UpdateStats = IndexMap<String, f32>;

/// The validated `(policy, strength, gamma)` every signal is built from
#[derive(Clone)]
pub struct SignalParams {
    policy: Arc<dyn Policy>,
    strength: f32,
    gamma: f32,
}

impl SignalParams {
    /// Validate and store the common parameters.
    ///
    /// `gamma` must lie in (0, 1] and `strength` must be non-negative; both
    /// must be finite.
    pub fn new(policy: Arc<dyn Policy>, strength: f32, gamma: f32) -> Result<Self> {
        if !gamma.is_finite() || gamma <= 0.0 || gamma > 1.0 {
            return Err(SignalError::InvalidParameter {
                name: "gamma",
                value: f64::from(gamma),
                reason: "must be in (0, 1]",
            });
        }
        if !strength.is_finite() || strength < 0.0 {
            return Err(SignalError::InvalidParameter {
                name: "strength",
                value: f64::from(strength),
                reason: "must be a finite value >= 0",
            });
        }
        Ok(Self {
            policy,
            strength,
            gamma,
        })
    }

    /// Build from the shared settings block
    pub fn from_settings(policy: Arc<dyn Policy>, settings: SignalSettings) -> Result<Self> {
        Self::new(policy, settings.strength, settings.gamma)
    }

    /// Policy the signal is attached to
    #[must_use]
    pub fn policy(&self) -> &Arc<dyn Policy> {
        &self.policy
    }

    /// Reward multiplier
    #[must_use]
    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Discount factor
    #[must_use]
    pub fn gamma(&self) -> f32 {
        self.gamma
    }
}

impl fmt::Debug for SignalParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalParams")
            .field("brain", &self.policy.brain().brain_name)
            .field("strength", &self.strength)
            .field("gamma", &self.gamma)
            .finish()
    }
}

/// A pluggable source of per-step reward layered on top of, or replacing,
/// the environment reward.
///
/// The provided `evaluate` and `update` are the neutral signal: zero rewards
/// and no training. Implementations override whichever of the two they need.
///
/// `evaluate` takes `&self` and may be called every environment step.
/// `update` takes `&mut self` and may only change the signal's own model;
/// the buffer and the policy are read-only to it.
pub trait RewardSignal: Send {
    /// Short display name, used in stat labels
    fn name(&self) -> &str;

    /// Common parameters
    fn params(&self) -> &SignalParams;

    /// Reward multiplier
    fn strength(&self) -> f32 {
        self.params().strength()
    }

    /// Discount factor
    fn gamma(&self) -> f32 {
        self.params().gamma()
    }

    /// Policy the signal is attached to
    fn policy(&self) -> &Arc<dyn Policy> {
        self.params().policy()
    }

    /// Label of this signal's value estimate
    fn value_name(&self) -> String {
        format!("Policy/{} Value Estimate", self.name())
    }

    /// Label of this signal's reward statistic
    fn stat_name(&self) -> String {
        format!("Policy/{} Reward", self.name())
    }

    /// Rewards for the agents in `current`, given the step that followed.
    ///
    /// Both returned sequences have one entry per agent in `current`.
    fn evaluate(&self, current: &StepSnapshot, _next: &StepSnapshot) -> Result<SignalOutput> {
        Ok(SignalOutput::from_unscaled(
            Array1::zeros(current.len()),
            self.strength(),
        ))
    }

    /// Train the signal's internal model, if any, on `n_sequences` sequences
    /// of `update_buffer`. Returns stats to log.
    fn update(&mut self, _update_buffer: &AgentBuffer, _n_sequences: usize) -> Result<UpdateStats> {
        Ok(UpdateStats::new())
    }
}

/// Signals that can be built from a trainer configuration block
pub trait FromSignalConfig: RewardSignal + Sized {
    /// Type name reported in configuration errors
    const TYPE_NAME: &'static str;

    /// Keys that must be present before the configuration is parsed
    const REQUIRED_KEYS: &'static [&'static str] = &[];

    /// Check that `config` holds every key in `required_keys`
    fn check_config(config: &SignalConfig, required_keys: &[&str]) -> Result<()> {
        crate::config::check_config(config, required_keys, Self::TYPE_NAME)
    }

    /// Build the signal. Callers are expected to have run
    /// [`Self::check_config`] with [`Self::REQUIRED_KEYS`].
    fn from_config(policy: Arc<dyn Policy>, config: &SignalConfig) -> Result<Self>;
}

/// Signal that contributes nothing: the trait's provided behavior on its own.
#[derive(Debug, Clone)]
pub struct NeutralRewardSignal {
    params: SignalParams,
}

impl NeutralRewardSignal {
    /// Create a neutral signal
    pub fn new(policy: Arc<dyn Policy>, strength: f32, gamma: f32) -> Result<Self> {
        Ok(Self {
            params: SignalParams::new(policy, strength, gamma)?,
        })
    }
}

impl RewardSignal for NeutralRewardSignal {
    fn name(&self) -> &str {
        "Neutral"
    }

    fn params(&self) -> &SignalParams {
        &self.params
    }
}

impl FromSignalConfig for NeutralRewardSignal {
    const TYPE_NAME: &'static str = "NeutralRewardSignal";

    fn from_config(policy: Arc<dyn Policy>, config: &SignalConfig) -> Result<Self> {
        let settings: SignalSettings = parse_settings(config)?;
        Ok(Self {
            params: SignalParams::from_settings(policy, settings)?,
        })
    }
}
