//! Reward signals for RL trainers
//!
//! This crate provides the concrete signals a trainer can configure:
//! - Extrinsic: the environment reward, scaled
//! - Curiosity: forward-model prediction error as intrinsic reward
//! - GAIL: adversarial imitation of expert demonstrations
//!
//! Signals are created by name through the [`registry`] and usually driven
//! together through a [`RewardSignalSuite`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod curiosity;
pub mod extrinsic;
pub mod gail;
pub mod model;
pub mod registry;
pub mod suite;
mod transition;

// Re-export signals
pub use curiosity::{CuriosityRewardSignal, CuriositySettings};
pub use extrinsic::ExtrinsicRewardSignal;
pub use gail::{load_demonstrations, GailRewardSignal, GailSettings};
pub use registry::{create_reward_signal, list_signals, register_signal, SignalRegistry};
pub use suite::RewardSignalSuite;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        create_reward_signal, CuriosityRewardSignal, ExtrinsicRewardSignal, GailRewardSignal,
        RewardSignalSuite, SignalRegistry,
    };
    pub use reward_signal_core::prelude::*;
}
