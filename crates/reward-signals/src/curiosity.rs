//! Curiosity: intrinsic reward from forward-model prediction error
//!
//! Observations are embedded by a fixed random encoder. A forward model
//! predicts the next embedding from the current one and the action taken; its
//! error is the reward, so transitions the model has not yet learned pay more.
//! An inverse model predicting the action from both embeddings is trained
//! alongside and reported as a diagnostic.

use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use reward_signal_core::prelude::*;
use reward_signal_core::{parse_settings, SignalSettings};

use crate::model::{Activation, Linear};
use crate::transition::{check_width, MatchedAgents};

fn default_learning_rate() -> f32 {
    3e-4
}

fn default_num_epoch() -> usize {
    3
}

/// Curiosity hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuriositySettings {
    /// Strength and gamma
    #[serde(flatten)]
    pub base: SignalSettings,
    /// Width of the observation embedding
    pub encoding_size: usize,
    /// SGD step size of the forward and inverse models
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    /// Passes over the update buffer per update
    #[serde(default = "default_num_epoch")]
    pub num_epoch: usize,
    /// Seed for weight initialization and shuffling
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Intrinsic curiosity reward signal
#[derive(Debug, Clone)]
pub struct CuriosityRewardSignal {
    params: SignalParams,
    settings: CuriositySettings,
    encoder: Linear,
    forward_model: Linear,
    inverse_model: Linear,
    has_updated: bool,
    rng: StdRng,
}

impl CuriosityRewardSignal {
    /// Create a curiosity signal sized for the policy's brain
    pub fn new(policy: Arc<dyn Policy>, settings: CuriositySettings) -> Result<Self> {
        if settings.encoding_size == 0 {
            return Err(SignalError::InvalidParameter {
                name: "encoding_size",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        let params = SignalParams::from_settings(policy, settings.base)?;

        let brain = params.policy().brain();
        let obs_size = brain.vector_observation_size;
        let action_size = brain.encoded_action_size();
        let enc = settings.encoding_size;

        let mut rng = settings
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let encoder = Linear::gaussian(obs_size, enc, Activation::Tanh, &mut rng);
        let forward_model = Linear::xavier(enc + action_size, enc, Activation::Identity, &mut rng);
        let inverse_model = Linear::xavier(2 * enc, action_size, Activation::Identity, &mut rng);

        info!(
            brain = %brain.brain_name,
            encoding_size = enc,
            strength = params.strength(),
            "created curiosity reward signal"
        );

        Ok(Self {
            params,
            settings,
            encoder,
            forward_model,
            inverse_model,
            has_updated: false,
            rng,
        })
    }

    /// Whether at least one training batch has been applied
    #[must_use]
    pub fn has_updated(&self) -> bool {
        self.has_updated
    }

    /// Hyperparameters in use
    #[must_use]
    pub fn settings(&self) -> &CuriositySettings {
        &self.settings
    }

    fn encode(&self, observations: ArrayView2<'_, f32>) -> Array2<f32> {
        self.encoder.forward(observations)
    }

    fn forward_input<'a>(&self, encoded: ArrayView2<'a, f32>, actions: ArrayView2<'a, f32>) -> Result<Array2<f32>> {
        concatenate(Axis(1), &[encoded, actions]).map_err(|e| SignalError::Other(e.into()))
    }

    /// Per-row `0.5 * ||forward(phi, a) - phi_next||^2`
    fn prediction_error(
        &self,
        observations: ArrayView2<'_, f32>,
        next_observations: ArrayView2<'_, f32>,
        actions: ArrayView2<'_, f32>,
    ) -> Result<Array1<f32>> {
        let encoded = self.encode(observations);
        let encoded_next = self.encode(next_observations);
        let predicted = self.forward_model.forward(self.forward_input(encoded.view(), actions.view())?.view());
        let squared = (predicted - &encoded_next).mapv_into(|d| d * d);
        Ok(squared.sum_axis(Axis(1)) * 0.5)
    }
}

impl RewardSignal for CuriosityRewardSignal {
    fn name(&self) -> &str {
        "Curiosity"
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

        let brain = self.policy().brain();
        let observations = matched.observations(current);
        let next_observations = matched.next_observations(next);
        check_width(&observations, brain.vector_observation_size)?;
        check_width(&next_observations, brain.vector_observation_size)?;
        let actions = brain.encode_actions(matched.actions(next).view())?;

        let errors = self.prediction_error(observations.view(), next_observations.view(), actions.view())?;
        for (&i, &error) in matched.current.iter().zip(errors.iter()) {
            unscaled[i] = error;
        }

        // Untrained models produce noise, so nothing is paid out before the
        // first update.
        let gate = if self.has_updated { self.strength() } else { 0.0 };
        let scaled_reward = unscaled.mapv(|r| (r * gate).clamp(0.0, 1.0));
        Ok(SignalOutput {
            scaled_reward,
            unscaled_reward: unscaled,
        })
    }

    fn update(&mut self, update_buffer: &AgentBuffer, n_sequences: usize) -> Result<UpdateStats> {
        let mut stats = UpdateStats::new();
        if n_sequences == 0 || update_buffer.is_empty() {
            return Ok(stats);
        }
        update_buffer.aligned_len()?;

        let brain = self.policy().brain().clone();
        let sequence_length = self.policy().sequence_length().max(1);
        let observations = update_buffer.to_array(BufferKey::VectorObs)?;
        let next_observations = update_buffer.to_array(BufferKey::NextVectorObs)?;
        let actions = brain.encode_actions(update_buffer.to_array(BufferKey::Actions)?.view())?;
        check_width(&observations, brain.vector_observation_size)?;
        check_width(&next_observations, brain.vector_observation_size)?;

        let encoded = self.encode(observations.view());
        let encoded_next = self.encode(next_observations.view());
        let batch_rows = n_sequences.saturating_mul(sequence_length);
        let learning_rate = self.settings.learning_rate;

        let mut forward_losses = Vec::new();
        let mut inverse_losses = Vec::new();
        for _ in 0..self.settings.num_epoch {
            let order = update_buffer.shuffled_indices(sequence_length, &mut self.rng);
            for batch in order.chunks_exact(batch_rows) {
                let phi = encoded.select(Axis(0), batch);
                let phi_next = encoded_next.select(Axis(0), batch);
                let action_batch = actions.select(Axis(0), batch);

                let forward_input = self.forward_input(phi.view(), action_batch.view())?;
                forward_losses.push(self.forward_model.mse_step(
                    forward_input.view(),
                    phi_next.view(),
                    learning_rate,
                ));

                let inverse_input = concatenate(Axis(1), &[phi.view(), phi_next.view()])
                    .map_err(|e| SignalError::Other(e.into()))?;
                inverse_losses.push(self.inverse_model.mse_step(
                    inverse_input.view(),
                    action_batch.view(),
                    learning_rate,
                ));
            }
        }

        if forward_losses.is_empty() {
            debug!(
                rows = observations.nrows(),
                batch_rows, "buffer smaller than one curiosity batch, skipping update"
            );
            return Ok(stats);
        }

        self.has_updated = true;
        let forward_loss = mean(&forward_losses);
        let inverse_loss = mean(&inverse_losses);
        debug!(forward_loss, inverse_loss, batches = forward_losses.len(), "curiosity update");

        stats.insert("Losses/Curiosity Forward Loss".to_string(), forward_loss);
        stats.insert("Losses/Curiosity Inverse Loss".to_string(), inverse_loss);
        Ok(stats)
    }
}

impl FromSignalConfig for CuriosityRewardSignal {
    const TYPE_NAME: &'static str = "CuriosityRewardSignal";
    const REQUIRED_KEYS: &'static [&'static str] = &["strength", "gamma", "encoding_size"];

    fn from_config(policy: Arc<dyn Policy>, config: &SignalConfig) -> Result<Self> {
        Self::new(policy, parse_settings(config)?)
    }
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}
