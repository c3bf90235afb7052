//! Core reward signal trait and types
//!
//! A reward signal computes an auxiliary or shaped reward on top of the
//! environment's own, and may train an internal model from collected
//! experience. This crate defines the contract, its configuration checks and
//! the snapshot and buffer types signals read from.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod buffer;
pub mod config;
pub mod error;
pub mod policy;
pub mod reward;
pub mod signal;
pub mod snapshot;

// Re-export core traits and types
pub use buffer::{AgentBuffer, BufferKey};
pub use config::{check_config, parse_settings, RewardSignalsConfig, SignalConfig, SignalSettings};
pub use error::{Result, SignalError};
pub use policy::{ActionSpaceType, BrainParameters, Policy};
pub use reward::{discount_rewards, SignalOutput};
pub use signal::{FromSignalConfig, NeutralRewardSignal, RewardSignal, SignalParams, UpdateStats};
pub use snapshot::{AgentId, StepSnapshot};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AgentBuffer, BrainParameters, BufferKey, FromSignalConfig, Policy, Result, RewardSignal,
        SignalConfig, SignalError, SignalOutput, SignalParams, StepSnapshot, UpdateStats,
    };
}
