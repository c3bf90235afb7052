//! Reward signal configuration

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::{Result, SignalError};

/// Hyperparameters of a single signal, as read from the trainer configuration
pub type SignalConfig = serde_json::Map<String, Value>;

/// Check that every key in `required_keys` is present in `config`.
///
/// Fails with [`SignalError::Config`] naming the first missing key and
/// `signal_name`. An empty `required_keys` always succeeds.
pub fn check_config(config: &SignalConfig, required_keys: &[&str], signal_name: &str) -> Result<()> {
    match required_keys.iter().find(|k| !config.contains_key(**k)) {
        Some(missing) => {
            tracing::warn!(key = *missing, signal = signal_name, "missing reward signal hyperparameter");
            Err(SignalError::missing_key(*missing, signal_name))
        }
        None => Ok(()),
    }
}

fn default_strength() -> f32 {
    1.0
}

fn default_gamma() -> f32 {
    0.99
}

/// Settings every signal accepts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSettings {
    /// Multiplier applied to the raw reward
    #[serde(default = "default_strength")]
    pub strength: f32,
    /// Discount factor for this signal's value estimates
    #[serde(default = "default_gamma")]
    pub gamma: f32,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            strength: default_strength(),
            gamma: default_gamma(),
        }
    }
}

/// Deserialize a signal's typed settings from its raw configuration
pub fn parse_settings<T: DeserializeOwned>(config: &SignalConfig) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(config.clone()))?)
}

/// The `reward_signals` section of a trainer configuration: signal name to
/// hyperparameters, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardSignalsConfig {
    signals: IndexMap<String, SignalConfig>,
}

impl RewardSignalsConfig {
    /// Create an empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a signal's settings
    pub fn insert(&mut self, name: impl Into<String>, config: SignalConfig) -> &mut Self {
        self.signals.insert(name.into(), config);
        self
    }

    /// Settings of a signal, if configured
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SignalConfig> {
        self.signals.get(name)
    }

    /// Configured signals in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SignalConfig)> {
        self.signals.iter().map(|(name, config)| (name.as_str(), config))
    }

    /// Number of configured signals
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Check if no signals are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Parse from JSON.
    ///
    /// Accepts either the bare `{ "<signal>": { ... } }` object or a trainer
    /// section that nests it under `reward_signals`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Build from an already parsed JSON value
    pub fn from_value(mut value: Value) -> Result<Self> {
        let nested = value
            .get_mut("reward_signals")
            .filter(|v| v.is_object())
            .map(Value::take);
        Ok(serde_json::from_value(nested.unwrap_or(value))?)
    }

    /// Load from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), signals = config.len(), "loaded reward signal configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> SignalConfig {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test helper expects an object"),
        }
    }

    #[test]
    fn test_no_required_keys_always_passes() {
        assert!(check_config(&SignalConfig::new(), &[], "AnySignal").is_ok());
    }

    #[test]
    fn test_missing_key_is_named() {
        let config = map(json!({ "a": 1 }));
        let err = check_config(&config, &["a", "b"], "CuriosityRewardSignal").unwrap_err();

        match err {
            SignalError::Config { key, signal } => {
                assert_eq!(key, "b");
                assert_eq!(signal, "CuriosityRewardSignal");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_first_missing_key_is_reported() {
        let config = map(json!({ "b": 1 }));
        let err = check_config(&config, &["a", "b", "c"], "GailRewardSignal").unwrap_err();

        assert_eq!(
            err.to_string(),
            "The hyper-parameter a could not be found for GailRewardSignal."
        );
    }

    #[test]
    fn test_all_keys_present() {
        let config = map(json!({ "a": 1, "b": 2 }));
        assert!(check_config(&config, &["a", "b"], "ExtrinsicRewardSignal").is_ok());
    }

    #[test]
    fn test_settings_defaults() {
        let settings: SignalSettings = parse_settings(&map(json!({ "strength": 0.5 }))).unwrap();
        assert_eq!(settings.strength, 0.5);
        assert_eq!(settings.gamma, 0.99);
    }

    #[test]
    fn test_settings_type_error() {
        let err = parse_settings::<SignalSettings>(&map(json!({ "gamma": "high" }))).unwrap_err();
        assert!(matches!(err, SignalError::Serialization(_)));
    }

    #[test]
    fn test_parse_nested_section_keeps_order() {
        let config = RewardSignalsConfig::from_json_str(
            r#"{
                "batch_size": 64,
                "reward_signals": {
                    "extrinsic": { "strength": 1.0, "gamma": 0.99 },
                    "curiosity": { "strength": 0.02, "gamma": 0.99, "encoding_size": 64 }
                }
            }"#,
        )
        .unwrap();

        let names: Vec<&str> = config.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["extrinsic", "curiosity"]);
        assert_eq!(config.get("curiosity").unwrap()["encoding_size"], json!(64));
    }

    #[test]
    fn test_parse_bare_section() {
        let config =
            RewardSignalsConfig::from_json_str(r#"{ "extrinsic": { "strength": 1.0, "gamma": 0.9 } }"#)
                .unwrap();
        assert_eq!(config.len(), 1);
    }

    proptest::proptest! {
        #[test]
        fn prop_present_keys_pass(keys in proptest::collection::btree_set("[a-z]{1,8}", 0..8)) {
            let config: SignalConfig = keys.iter().map(|k| (k.clone(), json!(1))).collect();
            let required: Vec<&str> = keys.iter().map(String::as_str).collect();
            proptest::prop_assert!(check_config(&config, &required, "Signal").is_ok());
        }
    }
}
