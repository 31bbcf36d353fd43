use std::num::NonZeroUsize;

/// One step of experience, owned exclusively by the worker that produced it.
#[derive(Debug, Clone, Copy)]
pub struct Experience {
    /// The action actually taken; the observed state itself stays on the
    /// model's retained graph.
    pub action: usize,
    /// The critic's value estimate at the observed state.
    pub value: f32,
    /// Log-probability of the action actually taken.
    pub log_prob: f32,
    /// Reward returned by the environment for that action.
    pub reward: f32,
    /// Entropy of the policy's action distribution at the state.
    pub entropy: f32,
}

/// A bounded buffer of experience, flushed as a whole every optimization.
///
/// Its length is strictly below the flush threshold at the start of every
/// collection step; reaching the threshold triggers a flush on the same
/// iteration.
#[derive(Debug)]
pub struct ExperienceBuffer {
    records: Vec<Experience>,
    threshold: NonZeroUsize,
}

impl ExperienceBuffer {
    /// Creates an empty buffer with the given flush threshold.
    pub fn new(threshold: NonZeroUsize) -> Self {
        Self {
            records: Vec::with_capacity(threshold.get()),
            threshold,
        }
    }

    /// Appends one experience record.
    pub fn push(&mut self, record: Experience) {
        debug_assert!(self.records.len() < self.threshold.get());
        self.records.push(record);
    }

    /// True once the buffer holds `threshold` records and must be flushed.
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.threshold.get()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The buffered records, oldest first.
    pub fn records(&self) -> &[Experience] {
        &self.records
    }

    /// Discards every record, keeping the allocation.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(reward: f32) -> Experience {
        Experience {
            action: 0,
            value: 0.,
            log_prob: 0.,
            reward,
            entropy: 0.,
        }
    }

    #[test]
    fn test_fills_up_to_threshold() {
        let mut buffer = ExperienceBuffer::new(NonZeroUsize::new(3).unwrap());

        buffer.push(record(1.));
        buffer.push(record(2.));
        assert!(!buffer.is_full());

        buffer.push(record(3.));
        assert!(buffer.is_full());
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_clear_resets_length() {
        let mut buffer = ExperienceBuffer::new(NonZeroUsize::new(2).unwrap());
        buffer.push(record(1.));
        buffer.push(record(2.));

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
    }
}
