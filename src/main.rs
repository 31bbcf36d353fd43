use std::{num::NonZeroUsize, sync::Arc};

use log::info;

use a3c::{
    CheckpointConfig, Coordinator, TrainConfig,
    config::ExplorationConfig,
    gym::{self, Corridor},
    metrics::LogSink,
    nn::LinearPolicy,
};

const CORRIDOR_LEN: usize = 8;

fn main() {
    env_logger::init();

    let cfg = TrainConfig {
        workers: NonZeroUsize::new(4).unwrap(),
        iterations: 20_000,
        flush_threshold: NonZeroUsize::new(30).unwrap(),
        exploration: ExplorationConfig {
            initial: 0.3,
            final_value: 0.01,
            horizon: NonZeroUsize::new(10_000).unwrap(),
            fallback_probs: vec![0.1, 0.1, 0.8],
        },
        checkpoint: Some(
            CheckpointConfig::new("checkpoints", "corridor")
                .with_interval(NonZeroUsize::new(5_000).unwrap()),
        ),
        ..TrainConfig::default()
    };

    let seed = cfg.seed;
    let coordinator = Coordinator::new(cfg);

    let outcome = coordinator.run(
        |id| {
            LinearPolicy::new(
                Corridor::obs_dim(CORRIDOR_LEN),
                gym::NUM_ACTIONS,
                seed + id as u64,
            )
        },
        |_| Corridor::new(CORRIDOR_LEN),
        Arc::new(LogSink),
    );

    match outcome {
        Ok(store) => {
            info!(global_steps = store.step_count(); "training finished");
        }
        Err(e) => {
            eprintln!("training failed: {e}");
            std::process::exit(1);
        }
    }
}
