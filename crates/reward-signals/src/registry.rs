//! Signal registry for creating reward signals by name

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use reward_signal_core::{FromSignalConfig, Policy, Result, RewardSignal, SignalConfig, SignalError};

use crate::{CuriosityRewardSignal, ExtrinsicRewardSignal, GailRewardSignal};

type SignalConstructor =
    Box<dyn Fn(Arc<dyn Policy>, &SignalConfig) -> Result<Box<dyn RewardSignal>> + Send + Sync>;

lazy_static::lazy_static! {
    static ref REGISTRY: Arc<Mutex<SignalRegistry>> = Arc::new(Mutex::new(SignalRegistry::with_builtin()));
}

/// Name to constructor map for reward signals
pub struct SignalRegistry {
    /// Registered signals
    signals: HashMap<String, SignalConstructor>,
}

impl SignalRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            signals: HashMap::new(),
        }
    }

    /// Registry holding `extrinsic`, `curiosity` and `gail`
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_type::<ExtrinsicRewardSignal>("extrinsic");
        registry.register_type::<CuriosityRewardSignal>("curiosity");
        registry.register_type::<GailRewardSignal>("gail");
        registry
    }

    /// Register a constructor under `name`, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(Arc<dyn Policy>, &SignalConfig) -> Result<Box<dyn RewardSignal>> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(signal = %name, "registered reward signal");
        self.signals.insert(name, Box::new(constructor));
    }

    /// Register a configurable signal type. Its required keys are checked
    /// before the configuration is parsed.
    pub fn register_type<S>(&mut self, name: impl Into<String>)
    where
        S: FromSignalConfig + 'static,
    {
        self.register(name, |policy, config| {
            S::check_config(config, S::REQUIRED_KEYS)?;
            Ok(Box::new(S::from_config(policy, config)?) as Box<dyn RewardSignal>)
        });
    }

    /// Create a signal by name
    pub fn make(
        &self,
        policy: Arc<dyn Policy>,
        name: &str,
        config: &SignalConfig,
    ) -> Result<Box<dyn RewardSignal>> {
        self.signals
            .get(name)
            .ok_or_else(|| SignalError::UnknownSignal(name.to_string()))
            .and_then(|constructor| constructor(policy, config))
    }

    /// Check whether `name` is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.signals.contains_key(name)
    }

    /// List registered signal names, sorted
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.signals.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for SignalRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// Register a signal globally
pub fn register_signal<F>(name: impl Into<String>, constructor: F)
where
    F: Fn(Arc<dyn Policy>, &SignalConfig) -> Result<Box<dyn RewardSignal>> + Send + Sync + 'static,
{
    REGISTRY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .register(name, constructor);
}

/// Create a signal by name from the global registry
pub fn create_reward_signal(
    policy: Arc<dyn Policy>,
    name: &str,
    config: &SignalConfig,
) -> Result<Box<dyn RewardSignal>> {
    REGISTRY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .make(policy, name, config)
}

/// List all globally registered signals
pub fn list_signals() -> Vec<String> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner).list()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reward_signal_core::{BrainParameters, NeutralRewardSignal};
    use serde_json::json;

    fn policy() -> Arc<dyn Policy> {
        Arc::new(BrainParameters::discrete("finder", 3, vec![2]))
    }

    fn config(value: serde_json::Value) -> SignalConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!(SignalRegistry::with_builtin().list(), vec!["curiosity", "extrinsic", "gail"]);
    }

    #[test]
    fn test_make_extrinsic() {
        let registry = SignalRegistry::with_builtin();
        let signal = registry
            .make(policy(), "extrinsic", &config(json!({ "strength": 1.0, "gamma": 0.99 })))
            .unwrap();

        assert_eq!(signal.name(), "Extrinsic");
    }

    #[test]
    fn test_unknown_signal() {
        let registry = SignalRegistry::with_builtin();
        let err = registry.make(policy(), "empowerment", &SignalConfig::new()).err().unwrap();

        assert_eq!(err.to_string(), "Unknown reward signal type empowerment");
    }

    #[test]
    fn test_missing_key_checked_before_parsing() {
        let registry = SignalRegistry::with_builtin();
        let err = registry
            .make(policy(), "curiosity", &config(json!({ "strength": 0.1, "gamma": 0.99 })))
            .err()
            .unwrap();

        assert_eq!(
            err.to_string(),
            "The hyper-parameter encoding_size could not be found for CuriosityRewardSignal."
        );
    }

    #[test]
    fn test_invalid_gamma_rejected() {
        let registry = SignalRegistry::with_builtin();
        let err = registry
            .make(policy(), "extrinsic", &config(json!({ "strength": 1.0, "gamma": 1.5 })))
            .err()
            .unwrap();

        assert!(matches!(err, SignalError::InvalidParameter { name: "gamma", .. }));
    }

    #[test]
    fn test_global_registration() {
        register_signal("neutral-test", |policy, config| {
            Ok(Box::new(NeutralRewardSignal::from_config(policy, config)?) as Box<dyn RewardSignal>)
        });

        assert!(list_signals().contains(&"neutral-test".to_string()));
        let signal = create_reward_signal(policy(), "neutral-test", &SignalConfig::new()).unwrap();
        assert_eq!(signal.name(), "Neutral");
    }
}
