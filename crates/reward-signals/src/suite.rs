//! All reward signals configured for one policy, driven together

use indexmap::IndexMap;
use ndarray::Array1;
use std::sync::Arc;

use reward_signal_core::{
    AgentBuffer, Policy, Result, RewardSignal, RewardSignalsConfig, SignalError, SignalOutput,
    StepSnapshot, UpdateStats,
};

use crate::registry::{create_reward_signal, SignalRegistry};

/// Named reward signals in configuration order
#[derive(Default)]
pub struct RewardSignalSuite {
    signals: IndexMap<String, Box<dyn RewardSignal>>,
}

impl RewardSignalSuite {
    /// Create an empty suite
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured signal through the global registry
    pub fn from_config(policy: &Arc<dyn Policy>, config: &RewardSignalsConfig) -> Result<Self> {
        let mut suite = Self::new();
        for (name, settings) in config.iter() {
            suite.insert(name, create_reward_signal(Arc::clone(policy), name, settings)?);
        }
        Ok(suite)
    }

    /// Build every configured signal through `registry`
    pub fn from_registry(
        registry: &SignalRegistry,
        policy: &Arc<dyn Policy>,
        config: &RewardSignalsConfig,
    ) -> Result<Self> {
        let mut suite = Self::new();
        for (name, settings) in config.iter() {
            suite.insert(name, registry.make(Arc::clone(policy), name, settings)?);
        }
        Ok(suite)
    }

    /// Add or replace a signal
    pub fn insert(&mut self, name: impl Into<String>, signal: Box<dyn RewardSignal>) {
        let name = name.into();
        tracing::info!(
            signal = %name,
            strength = signal.strength(),
            gamma = signal.gamma(),
            "added reward signal"
        );
        self.signals.insert(name, signal);
    }

    /// Signal registered under `name`
    #[must_use]
    pub fn signal(&self, name: &str) -> Option<&dyn RewardSignal> {
        self.signals.get(name).map(|signal| &**signal)
    }

    /// Signal names in configuration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.signals.keys().map(String::as_str)
    }

    /// Number of signals
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Check if the suite holds no signals
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Evaluate every signal for one step
    pub fn evaluate_all(
        &self,
        current: &StepSnapshot,
        next: &StepSnapshot,
    ) -> Result<IndexMap<String, SignalOutput>> {
        self.signals
            .iter()
            .map(|(name, signal)| Ok((name.clone(), signal.evaluate(current, next)?)))
            .collect()
    }

    /// Element-wise sum of the scaled rewards of `outputs`
    pub fn combined_reward(num_agents: usize, outputs: &IndexMap<String, SignalOutput>) -> Result<Array1<f32>> {
        let mut total = Array1::zeros(num_agents);
        for output in outputs.values() {
            if output.len() != num_agents {
                return Err(SignalError::DimensionMismatch {
                    expected: num_agents,
                    actual: output.len(),
                });
            }
            total += &output.scaled_reward;
        }
        Ok(total)
    }

    /// Update every signal and merge their stats
    pub fn update_all(&mut self, update_buffer: &AgentBuffer, n_sequences: usize) -> Result<UpdateStats> {
        let mut stats = UpdateStats::new();
        for signal in self.signals.values_mut() {
            stats.extend(signal.update(update_buffer, n_sequences)?);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use reward_signal_core::{BrainParameters, NeutralRewardSignal};

    fn policy() -> Arc<dyn Policy> {
        Arc::new(BrainParameters::discrete("hallway", 2, vec![2]))
    }

    fn snapshot(rewards: Vec<f32>) -> StepSnapshot {
        let n = rewards.len();
        StepSnapshot::new(
            (0..n as u64).collect(),
            Array2::zeros((n, 2)),
            rewards,
            vec![false; n],
            Array2::zeros((n, 1)),
        )
        .unwrap()
    }

    fn config() -> RewardSignalsConfig {
        RewardSignalsConfig::from_json_str(
            r#"{
                "extrinsic": { "strength": 1.0, "gamma": 0.99 },
                "curiosity": { "strength": 0.01, "gamma": 0.9, "encoding_size": 4, "seed": 9 }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_from_config_keeps_order() {
        let suite = RewardSignalSuite::from_config(&policy(), &config()).unwrap();

        assert_eq!(suite.names().collect::<Vec<_>>(), vec!["extrinsic", "curiosity"]);
        assert_eq!(suite.signal("curiosity").unwrap().gamma(), 0.9);
        assert!(suite.signal("gail").is_none());
    }

    #[test]
    fn test_from_config_reports_bad_signal() {
        let bad = RewardSignalsConfig::from_json_str(r#"{ "extrinsic": { "strength": 1.0 } }"#).unwrap();
        let err = RewardSignalSuite::from_registry(&SignalRegistry::with_builtin(), &policy(), &bad)
            .err()
            .unwrap();

        assert!(matches!(err, SignalError::Config { ref key, .. } if key == "gamma"));
    }

    #[test]
    fn test_combined_reward_sums_scaled_rewards() {
        let mut suite = RewardSignalSuite::new();
        suite.insert(
            "extrinsic",
            Box::new(crate::ExtrinsicRewardSignal::new(policy(), 0.5, 0.99).unwrap()),
        );
        suite.insert(
            "neutral",
            Box::new(NeutralRewardSignal::new(policy(), 3.0, 0.99).unwrap()),
        );

        let outputs = suite.evaluate_all(&snapshot(vec![0.0; 2]), &snapshot(vec![2.0, 4.0])).unwrap();
        let total = RewardSignalSuite::combined_reward(2, &outputs).unwrap();

        assert_eq!(outputs["extrinsic"].unscaled_reward, array![2.0, 4.0]);
        assert_eq!(total, array![1.0, 2.0]);
    }

    #[test]
    fn test_combined_reward_length_mismatch() {
        let mut outputs = IndexMap::new();
        outputs.insert("a".to_string(), SignalOutput::zeros(3));

        assert!(RewardSignalSuite::combined_reward(2, &outputs).is_err());
    }

    #[test]
    fn test_update_all_merges_stats() {
        let mut suite = RewardSignalSuite::from_config(&policy(), &config()).unwrap();
        let mut buffer = AgentBuffer::new();
        for i in 0..8 {
            let x = i as f32 / 8.0;
            buffer.push_step(vec![x, -x], vec![x + 0.1, -x], vec![(i % 2) as f32], 0.0, false);
        }

        let stats = suite.update_all(&buffer, 4).unwrap();

        assert_eq!(stats.len(), 2);
        assert!(stats.contains_key("Losses/Curiosity Forward Loss"));
    }
}
