//! Adversarial imitation reward
//!
//! A logistic discriminator is trained to tell expert demonstrations from the
//! policy's own experience. Steps the discriminator mistakes for expert ones
//! earn `-ln(1 - D(x))`.

use ndarray::{concatenate, Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use reward_signal_core::prelude::*;
use reward_signal_core::{parse_settings, SignalSettings};

use crate::model::{Activation, Linear};
use crate::transition::{check_width, MatchedAgents};

const EPSILON: f32 = 1e-7;

fn default_learning_rate() -> f32 {
    3e-4
}

fn default_num_epoch() -> usize {
    3
}

/// GAIL hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GailSettings {
    /// Strength and gamma
    #[serde(flatten)]
    pub base: SignalSettings,
    /// JSON file holding the expert [`AgentBuffer`]
    #[serde(default)]
    pub demo_path: Option<PathBuf>,
    /// SGD step size of the discriminator
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    /// Feed actions to the discriminator alongside observations
    #[serde(default)]
    pub use_actions: bool,
    /// Passes over the update buffer per update
    #[serde(default = "default_num_epoch")]
    pub num_epoch: usize,
    /// Seed for weight initialization and sampling
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Load an expert buffer written as JSON
pub fn load_demonstrations(path: impl AsRef<Path>) -> Result<AgentBuffer> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let buffer: AgentBuffer = serde_json::from_str(&json)?;
    info!(
        path = %path.display(),
        steps = buffer.num_experiences(),
        "loaded expert demonstrations"
    );
    Ok(buffer)
}

/// Generative adversarial imitation reward signal
#[derive(Debug, Clone)]
pub struct GailRewardSignal {
    params: SignalParams,
    settings: GailSettings,
    discriminator: Linear,
    expert_inputs: Array2<f32>,
    rng: StdRng,
}

impl GailRewardSignal {
    /// Create a GAIL signal from an in-memory expert buffer
    pub fn with_expert_buffer(
        policy: Arc<dyn Policy>,
        settings: GailSettings,
        expert: &AgentBuffer,
    ) -> Result<Self> {
        let params = SignalParams::from_settings(policy, settings.base)?;
        let brain = params.policy().brain();

        let expert_inputs = discriminator_inputs(
            brain,
            settings.use_actions,
            expert.to_array(BufferKey::VectorObs)?,
            || expert.to_array(BufferKey::Actions),
        )?;
        if expert_inputs.nrows() == 0 {
            return Err(SignalError::MissingField(BufferKey::VectorObs));
        }

        let mut rng = settings
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let discriminator = Linear::xavier(expert_inputs.ncols(), 1, Activation::Sigmoid, &mut rng);

        info!(
            brain = %brain.brain_name,
            expert_steps = expert_inputs.nrows(),
            use_actions = settings.use_actions,
            "created GAIL reward signal"
        );

        Ok(Self {
            params,
            settings,
            discriminator,
            expert_inputs,
            rng,
        })
    }

    /// Create a GAIL signal, reading demonstrations from `settings.demo_path`
    pub fn new(policy: Arc<dyn Policy>, settings: GailSettings) -> Result<Self> {
        let path = settings
            .demo_path
            .clone()
            .ok_or_else(|| SignalError::missing_key("demo_path", Self::TYPE_NAME))?;
        let expert = load_demonstrations(path)?;
        Self::with_expert_buffer(policy, settings, &expert)
    }

    /// Hyperparameters in use
    #[must_use]
    pub fn settings(&self) -> &GailSettings {
        &self.settings
    }

    /// Discriminator's probability that each row is expert behavior
    fn expert_probability(&self, inputs: &Array2<f32>) -> Array1<f32> {
        self.discriminator.forward(inputs.view()).column(0).to_owned()
    }
}

/// Stack observations, and encoded actions when enabled, into discriminator
/// rows
fn discriminator_inputs<F>(
    brain: &BrainParameters,
    use_actions: bool,
    observations: Array2<f32>,
    actions: F,
) -> Result<Array2<f32>>
where
    F: FnOnce() -> Result<Array2<f32>>,
{
    check_width(&observations, brain.vector_observation_size)?;
    if !use_actions {
        return Ok(observations);
    }

    let actions = brain.encode_actions(actions()?.view())?;
    if actions.nrows() != observations.nrows() {
        return Err(SignalError::DimensionMismatch {
            expected: observations.nrows(),
            actual: actions.nrows(),
        });
    }
    concatenate(Axis(1), &[observations.view(), actions.view()]).map_err(|e| SignalError::Other(e.into()))
}

impl RewardSignal for GailRewardSignal {
    fn name(&self) -> &str {
        "GAIL"
    }

    fn params(&self) -> &SignalParams {
        &self.params
    }

    fn evaluate(&self, current: &StepSnapshot, next: &StepSnapshot) -> Result<SignalOutput> {
        let mut unscaled = Array1::zeros(current.len());
        let matched = MatchedAgents::between(current, next)?;
        if matched.is_empty() {
            return Ok(SignalOutput::from_unscaled(unscaled, self.strength()));
        }

        let inputs = discriminator_inputs(
            self.policy().brain(),
            self.settings.use_actions,
            matched.observations(current),
            || Ok(matched.actions(next)),
        )?;
        let probabilities = self.expert_probability(&inputs);
        for (&i, &d) in matched.current.iter().zip(probabilities.iter()) {
            unscaled[i] = -(1.0 - d + EPSILON).ln();
        }

        Ok(SignalOutput::from_unscaled(unscaled, self.strength()))
    }

    fn update(&mut self, update_buffer: &AgentBuffer, n_sequences: usize) -> Result<UpdateStats> {
        let mut stats = UpdateStats::new();
        if n_sequences == 0 || update_buffer.is_empty() {
            return Ok(stats);
        }
        update_buffer.aligned_len()?;

        let sequence_length = self.policy().sequence_length().max(1);
        let policy_inputs = discriminator_inputs(
            self.policy().brain(),
            self.settings.use_actions,
            update_buffer.to_array(BufferKey::VectorObs)?,
            || update_buffer.to_array(BufferKey::Actions),
        )?;

        let batch_rows = n_sequences.saturating_mul(sequence_length);
        let expert_rows = self.expert_inputs.nrows();
        let learning_rate = self.settings.learning_rate;

        let mut losses = Vec::new();
        let mut policy_estimates = Vec::new();
        let mut expert_estimates = Vec::new();
        for _ in 0..self.settings.num_epoch {
            let order = update_buffer.shuffled_indices(sequence_length, &mut self.rng);
            for batch in order.chunks_exact(batch_rows) {
                let expert_batch: Vec<usize> = (0..batch.len())
                    .map(|_| self.rng.gen_range(0..expert_rows))
                    .collect();
                let expert = self.expert_inputs.select(Axis(0), &expert_batch);
                let policy = policy_inputs.select(Axis(0), batch);

                expert_estimates.push(self.expert_probability(&expert).mean().unwrap_or(0.0));
                policy_estimates.push(self.expert_probability(&policy).mean().unwrap_or(0.0));

                let inputs = concatenate(Axis(0), &[expert.view(), policy.view()])
                    .map_err(|e| SignalError::Other(e.into()))?;
                let mut labels = Array2::zeros((inputs.nrows(), 1));
                labels.slice_mut(ndarray::s![..expert.nrows(), ..]).fill(1.0);

                losses.push(self.discriminator.bce_step(inputs.view(), labels.view(), learning_rate));
            }
        }

        if losses.is_empty() {
            debug!(
                rows = policy_inputs.nrows(),
                batch_rows, "buffer smaller than one GAIL batch, skipping update"
            );
            return Ok(stats);
        }

        let loss = mean(&losses);
        debug!(loss, batches = losses.len(), "GAIL update");

        stats.insert("Losses/GAIL Loss".to_string(), loss);
        stats.insert("Policy/GAIL Policy Estimate".to_string(), mean(&policy_estimates));
        stats.insert("Policy/GAIL Expert Estimate".to_string(), mean(&expert_estimates));
        Ok(stats)
    }
}

impl FromSignalConfig for GailRewardSignal {
    const TYPE_NAME: &'static str = "GailRewardSignal";
    const REQUIRED_KEYS: &'static [&'static str] = &["strength", "gamma", "demo_path"];

    fn from_config(policy: Arc<dyn Policy>, config: &SignalConfig) -> Result<Self> {
        Self::new(policy, parse_settings(config)?)
    }
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brain() -> BrainParameters {
        BrainParameters::continuous("imitator", 2, 1)
    }

    fn settings(use_actions: bool) -> GailSettings {
        GailSettings {
            base: SignalSettings {
                strength: 0.1,
                gamma: 0.99,
            },
            demo_path: None,
            learning_rate: 0.5,
            use_actions,
            num_epoch: 1,
            seed: Some(3),
        }
    }

    /// Expert observations sit near (+1, +1), policy ones near (-1, -1).
    fn buffer(center: f32, steps: usize) -> AgentBuffer {
        let mut rng = StdRng::seed_from_u64(center.to_bits().into());
        let mut buffer = AgentBuffer::new();
        for _ in 0..steps {
            let obs = vec![center + rng.gen_range(-0.2..0.2), center + rng.gen_range(-0.2..0.2)];
            buffer.push_step(obs.clone(), obs, vec![center], 0.0, false);
        }
        buffer
    }

    fn snapshot(obs: f32) -> StepSnapshot {
        StepSnapshot::new(
            vec![0],
            Array2::from_elem((1, 2), obs),
            vec![0.0],
            vec![false],
            Array2::from_elem((1, 1), obs),
        )
        .unwrap()
    }

    #[test]
    fn test_discriminator_learns_expert_behavior() {
        let mut signal =
            GailRewardSignal::with_expert_buffer(Arc::new(brain()), settings(false), &buffer(1.0, 64))
                .unwrap();
        let policy_buffer = buffer(-1.0, 64);

        let mut stats = UpdateStats::new();
        for _ in 0..50 {
            stats = signal.update(&policy_buffer, 16).unwrap();
        }

        assert!(stats["Policy/GAIL Expert Estimate"] > stats["Policy/GAIL Policy Estimate"]);
        assert!(stats.contains_key("Losses/GAIL Loss"));

        let expert_like = signal.evaluate(&snapshot(1.0), &snapshot(1.0)).unwrap();
        let policy_like = signal.evaluate(&snapshot(-1.0), &snapshot(-1.0)).unwrap();
        assert!(expert_like.unscaled_reward[0] > policy_like.unscaled_reward[0]);
        assert!((expert_like.scaled_reward[0] - 0.1 * expert_like.unscaled_reward[0]).abs() < 1e-6);
    }

    #[test]
    fn test_reward_is_non_negative() {
        let signal =
            GailRewardSignal::with_expert_buffer(Arc::new(brain()), settings(true), &buffer(1.0, 8))
                .unwrap();

        let output = signal.evaluate(&snapshot(0.3), &snapshot(0.3)).unwrap();
        assert!(output.unscaled_reward[0] >= 0.0);
    }

    #[test]
    fn test_expert_buffer_needs_actions_when_used() {
        let mut expert = AgentBuffer::new();
        expert.append(BufferKey::VectorObs, vec![1.0, 1.0]);

        let err = GailRewardSignal::with_expert_buffer(Arc::new(brain()), settings(true), &expert)
            .unwrap_err();
        assert!(matches!(err, SignalError::MissingField(BufferKey::Actions)));
    }

    #[test]
    fn test_small_buffer_skips_update() {
        let mut signal =
            GailRewardSignal::with_expert_buffer(Arc::new(brain()), settings(false), &buffer(1.0, 8))
                .unwrap();

        assert!(signal.update(&buffer(-1.0, 2), 4).unwrap().is_empty());
    }

    #[test]
    fn test_uneven_buffer_fields_rejected() {
        let mut signal =
            GailRewardSignal::with_expert_buffer(Arc::new(brain()), settings(false), &buffer(1.0, 8))
                .unwrap();
        let mut policy_buffer = buffer(-1.0, 4);
        policy_buffer.append(BufferKey::Done, vec![1.0]);

        let err = signal.update(&policy_buffer, 1).unwrap_err();
        assert!(matches!(err, SignalError::DimensionMismatch { expected: 4, actual: 5 }));
    }

    #[test]
    fn test_loads_demonstrations_from_config() {
        let path = std::env::temp_dir().join(format!("gail-demo-{}.json", std::process::id()));
        std::fs::write(&path, serde_json::to_string(&buffer(1.0, 4)).unwrap()).unwrap();

        let config: SignalConfig = serde_json::from_value(serde_json::json!({
            "strength": 1.0,
            "gamma": 0.99,
            "demo_path": path,
            "seed": 1,
        }))
        .unwrap();
        GailRewardSignal::check_config(&config, GailRewardSignal::REQUIRED_KEYS).unwrap();
        let signal = GailRewardSignal::from_config(Arc::new(brain()), &config).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(signal.name(), "GAIL");
        assert_eq!(signal.settings().num_epoch, 3);
    }

    #[test]
    fn test_missing_demo_file() {
        let mut settings = settings(false);
        settings.demo_path = Some(PathBuf::from("/nonexistent/expert.json"));

        let err = GailRewardSignal::new(Arc::new(brain()), settings).unwrap_err();
        assert!(matches!(err, SignalError::Io(_)));
    }
}
