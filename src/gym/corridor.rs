use crate::env::{EnvErr, EnvStep, Environment};

/// Actions understood by the corridor.
pub const ACTION_STAY: usize = 0;
pub const ACTION_LEFT: usize = 1;
pub const ACTION_RIGHT: usize = 2;
pub const NUM_ACTIONS: usize = 3;

/// A deterministic one-dimensional corridor.
///
/// The agent starts at cell 0 and observes its position one-hot encoded.
/// Reaching the last cell pays 1.0 and ends the episode; the corridor then
/// resets itself so the next `step` starts a fresh episode. Every other
/// transition pays a small negative step cost.
pub struct Corridor {
    length: usize,
    position: usize,
}

const STEP_COST: f32 = -0.01;
const GOAL_REWARD: f32 = 1.0;

impl Corridor {
    pub fn new(length: usize) -> Self {
        assert!(length >= 2, "a corridor needs at least two cells");
        Self { length, position: 0 }
    }

    /// Observation length for a corridor of the given size.
    pub fn obs_dim(length: usize) -> usize {
        length
    }

    fn observe(&self) -> Vec<f32> {
        let mut obs = vec![0.; self.length];
        obs[self.position] = 1.;
        obs
    }
}

impl Environment for Corridor {
    type Obs = Vec<f32>;

    fn step(&mut self, action: usize) -> Result<EnvStep<Self::Obs>, EnvErr> {
        match action {
            ACTION_STAY => {}
            ACTION_LEFT => self.position = self.position.saturating_sub(1),
            ACTION_RIGHT => self.position += 1,
            other => {
                return Err(EnvErr::Step {
                    detail: format!("unknown action {other}"),
                });
            }
        }

        if self.position == self.length - 1 {
            self.position = 0;
            return Ok(EnvStep {
                observation: self.observe(),
                reward: GOAL_REWARD,
                done: true,
            });
        }

        Ok(EnvStep {
            observation: self.observe(),
            reward: STEP_COST,
            done: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaching_the_goal_ends_the_episode() {
        let mut env = Corridor::new(3);

        let step = env.step(ACTION_RIGHT).unwrap();
        assert!(!step.done);
        assert_eq!(step.reward, STEP_COST);
        assert_eq!(step.observation, vec![0., 1., 0.]);

        let step = env.step(ACTION_RIGHT).unwrap();
        assert!(step.done);
        assert_eq!(step.reward, GOAL_REWARD);
    }

    #[test]
    fn test_resets_after_a_terminal_step() {
        let mut env = Corridor::new(2);

        let step = env.step(ACTION_RIGHT).unwrap();
        assert!(step.done);
        // The observation returned with the terminal step already belongs to
        // the next episode.
        assert_eq!(step.observation, vec![1., 0.]);

        let step = env.step(ACTION_STAY).unwrap();
        assert!(!step.done);
    }

    #[test]
    fn test_stay_and_left_at_the_start_are_no_ops() {
        let mut env = Corridor::new(4);

        let step = env.step(ACTION_STAY).unwrap();
        assert_eq!(step.observation, vec![1., 0., 0., 0.]);

        let step = env.step(ACTION_LEFT).unwrap();
        assert_eq!(step.observation, vec![1., 0., 0., 0.]);
    }

    #[test]
    fn test_unknown_action_is_a_step_error() {
        let mut env = Corridor::new(3);
        assert!(matches!(env.step(42), Err(EnvErr::Step { .. })));
    }
}
