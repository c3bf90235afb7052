//! Example: shaping a random walk with extrinsic and curiosity rewards

use ndarray::Array2;
use rand::Rng;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use reward_signal_core::{
    discount_rewards, AgentBuffer, BrainParameters, Policy, RewardSignalsConfig, StepSnapshot,
};
use reward_signals::RewardSignalSuite;

const NUM_AGENTS: usize = 4;
const GOAL: f32 = 5.0;

/// Agents walk on a line; action 0 steps left, 1 stays, 2 steps right.
fn step_positions(positions: &mut [f32], actions: &[usize]) -> (Vec<f32>, Vec<bool>) {
    let mut rewards = vec![0.0; positions.len()];
    let mut done = vec![false; positions.len()];
    for (i, (pos, &action)) in positions.iter_mut().zip(actions).enumerate() {
        *pos += action as f32 - 1.0;
        if pos.abs() >= GOAL {
            rewards[i] = if *pos > 0.0 { 1.0 } else { -1.0 };
            done[i] = true;
            *pos = 0.0;
        }
    }
    (rewards, done)
}

fn snapshot(
    positions: &[f32],
    rewards: Vec<f32>,
    done: Vec<bool>,
    actions: &[usize],
) -> reward_signal_core::Result<StepSnapshot> {
    let observations = Array2::from_shape_fn((positions.len(), 2), |(i, j)| {
        if j == 0 { positions[i] / GOAL } else { 1.0 }
    });
    let previous_actions = Array2::from_shape_fn((actions.len(), 1), |(i, _)| actions[i] as f32);
    StepSnapshot::new(
        (0..positions.len() as u64).collect(),
        observations,
        rewards,
        done,
        previous_actions,
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("reward_signals=info".parse()?))
        .init();

    let policy: Arc<dyn Policy> = Arc::new(BrainParameters::discrete("walker", 2, vec![3]));
    let config = RewardSignalsConfig::from_json_str(
        r#"{
            "reward_signals": {
                "extrinsic": { "strength": 1.0, "gamma": 0.99 },
                "curiosity": { "strength": 0.05, "gamma": 0.99, "encoding_size": 16, "learning_rate": 0.01 }
            }
        }"#,
    )?;
    let mut suite = RewardSignalSuite::from_config(&policy, &config)?;

    let mut rng = rand::thread_rng();
    let mut positions = vec![0.0_f32; NUM_AGENTS];
    let mut current = snapshot(&positions, vec![0.0; NUM_AGENTS], vec![false; NUM_AGENTS], &[1; NUM_AGENTS])?;

    for iteration in 0..5 {
        let mut buffer = AgentBuffer::new();
        let mut shaped = Vec::new();

        for _ in 0..64 {
            let actions: Vec<usize> = (0..NUM_AGENTS).map(|_| rng.gen_range(0..3)).collect();
            let (rewards, done) = step_positions(&mut positions, &actions);
            let next = snapshot(&positions, rewards.clone(), done.clone(), &actions)?;

            let outputs = suite.evaluate_all(&current, &next)?;
            let total = RewardSignalSuite::combined_reward(NUM_AGENTS, &outputs)?;
            shaped.push(total.sum() / NUM_AGENTS as f32);

            for i in 0..NUM_AGENTS {
                buffer.push_step(
                    current.observation(i).to_vec(),
                    next.observation(i).to_vec(),
                    vec![actions[i] as f32],
                    rewards[i],
                    done[i],
                );
            }
            current = next;
        }

        let stats = suite.update_all(&buffer, 32)?;
        let returns = discount_rewards(&shaped, 0.99, 0.0);
        println!("Iteration {}: shaped return = {:.3}", iteration + 1, returns[0]);
        for (name, value) in &stats {
            println!("  {name}: {value:.5}");
        }
    }

    Ok(())
}
