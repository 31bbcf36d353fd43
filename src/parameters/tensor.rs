use serde::{Deserialize, Serialize};

/// The identity of a parameter tensor: its name and shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<usize>,
}

/// A named, shaped parameter tensor stored as a flat `f32` buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorData {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorData {
    /// Creates a tensor from a shape and a flat data buffer.
    ///
    /// # Panics
    /// If `data.len()` doesn't match the product of `shape`.
    pub fn new(name: impl Into<String>, shape: Vec<usize>, data: Vec<f32>) -> Self {
        assert_eq!(shape.iter().product::<usize>(), data.len());
        Self {
            name: name.into(),
            shape,
            data,
        }
    }

    /// Creates a zero-filled tensor of the given shape.
    pub fn zeros(name: impl Into<String>, shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            name: name.into(),
            shape,
            data: vec![0.; len],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The full ordered parameter set of a model, one `TensorData` per tensor.
///
/// Used both as the worker's local parameter copy and as the checkpoint
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub tensors: Vec<TensorData>,
}

impl ParameterSnapshot {
    pub fn new(tensors: Vec<TensorData>) -> Self {
        Self { tensors }
    }

    /// Total number of scalar parameters across all tensors.
    pub fn num_params(&self) -> usize {
        self.tensors.iter().map(TensorData::len).sum()
    }
}

/// A gradient for the shared parameter set, index-aligned with its tensors.
///
/// `None` entries mark tensors without a gradient this cycle; the store skips
/// them without treating the gap as an error.
#[derive(Debug, Clone, Default)]
pub struct GradientSet {
    pub grads: Vec<Option<Vec<f32>>>,
}

impl GradientSet {
    pub fn new(grads: Vec<Option<Vec<f32>>>) -> Self {
        Self { grads }
    }

    /// The L2 norm over every present gradient entry, taken jointly.
    pub fn global_norm(&self) -> f32 {
        self.grads
            .iter()
            .flatten()
            .flat_map(|g| g.iter())
            .map(|g| g * g)
            .sum::<f32>()
            .sqrt()
    }

    /// Scales all gradients down so their joint L2 norm is at most `max_norm`.
    ///
    /// # Returns
    /// The norm before clipping.
    pub fn clip_global_norm(&mut self, max_norm: f32) -> f32 {
        let norm = self.global_norm();

        if norm > max_norm && norm > 0. {
            let scale = max_norm / norm;
            self.grads
                .iter_mut()
                .flatten()
                .for_each(|g| g.iter_mut().for_each(|v| *v *= scale));
        }

        norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_norm_skips_missing_tensors() {
        let set = GradientSet::new(vec![Some(vec![3., 4.]), None]);
        assert_eq!(set.global_norm(), 5.);
    }

    #[test]
    fn test_clip_below_max_is_identity() {
        let mut set = GradientSet::new(vec![Some(vec![3., 4.])]);
        let norm = set.clip_global_norm(10.);

        assert_eq!(norm, 5.);
        assert_eq!(set.grads[0].as_deref(), Some([3., 4.].as_slice()));
    }

    #[test]
    fn test_clip_rescales_to_max() {
        let mut set = GradientSet::new(vec![Some(vec![3., 4.]), Some(vec![0.])]);
        let norm = set.clip_global_norm(1.);

        assert_eq!(norm, 5.);
        let clipped = set.grads[0].as_deref().unwrap();
        assert!((clipped[0] - 0.6).abs() < 1e-6);
        assert!((clipped[1] - 0.8).abs() < 1e-6);
        assert!((set.global_norm() - 1.).abs() < 1e-6);
    }

    #[test]
    fn test_snapshot_param_count() {
        let snap = ParameterSnapshot::new(vec![
            TensorData::zeros("a", vec![2, 3]),
            TensorData::zeros("b", vec![4]),
        ]);
        assert_eq!(snap.num_params(), 10);
    }
}
