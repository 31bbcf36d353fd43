use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use rayon::prelude::*;

use super::{GradientSet, ParameterSnapshot, Result, SyncErr, TensorData, TensorSlot, TensorSpec};
use crate::optimization::Optimizer;

/// The single canonical parameter set, jointly owned by every worker.
///
/// Cloning is cheap and produces another handle onto the same shared state.
/// Exclusion is per tensor; the only cross-tensor shared piece is the global
/// step counter, which is a single atomic shared across *all* tensors and
/// incremented exactly once per `apply_gradients` call.
#[derive(Debug)]
pub struct SharedParameterStore<O: Optimizer> {
    slots: Arc<[TensorSlot<O>]>,
    specs: Arc<[TensorSpec]>,
    step: Arc<AtomicU64>,
}

impl<O: Optimizer> Clone for SharedParameterStore<O> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            specs: Arc::clone(&self.specs),
            step: Arc::clone(&self.step),
        }
    }
}

impl<O: Optimizer> SharedParameterStore<O> {
    /// Creates a new `SharedParameterStore`.
    ///
    /// # Arguments
    /// * `initial` - The initial parameter set, one entry per tensor.
    /// * `factory` - An `Optimizer` factory closure, called with each tensor's length.
    pub fn new<F>(initial: ParameterSnapshot, mut factory: F) -> Self
    where
        F: FnMut(usize) -> O,
    {
        let mut slots = Vec::with_capacity(initial.tensors.len());
        let mut specs = Vec::with_capacity(initial.tensors.len());

        for tensor in initial.tensors {
            let optimizer = factory(tensor.len());
            specs.push(TensorSpec {
                name: tensor.name,
                shape: tensor.shape,
            });
            slots.push(TensorSlot::new(tensor.data, optimizer));
        }

        Self {
            slots: Arc::from(slots),
            specs: Arc::from(specs),
            step: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the number of tensors in the store.
    pub fn num_tensors(&self) -> usize {
        self.slots.len()
    }

    /// The current value of the shared global step counter.
    pub fn step_count(&self) -> u64 {
        self.step.load(Ordering::Acquire)
    }

    fn validate_grad(&self, grads: &GradientSet) -> Result<()> {
        if grads.grads.len() != self.slots.len() {
            return Err(SyncErr::TensorCount {
                got: grads.grads.len(),
                expected: self.slots.len(),
            });
        }

        for (index, (grad, slot)) in grads.grads.iter().zip(self.slots.iter()).enumerate() {
            if let Some(grad) = grad
                && grad.len() != slot.len()
            {
                return Err(SyncErr::TensorLength {
                    index,
                    name: self.specs[index].name.clone(),
                    got: grad.len(),
                    expected: slot.len(),
                });
            }
        }

        Ok(())
    }
}

impl<O: Optimizer + Send + Sync> SharedParameterStore<O> {
    /// Applies a gradient set to the shared parameters.
    ///
    /// The global step counter advances exactly once per call; every tensor
    /// touched by the call uses that same counter value for bias correction.
    /// `None` entries are skipped. Tensor updates run in parallel and only
    /// contend with concurrent callers touching the same tensor.
    ///
    /// # Arguments
    /// * `grads` - The gradient set, index-aligned with the store's tensors.
    ///
    /// # Errors
    /// `SyncErr` if the gradient set doesn't match the store's tensor
    /// identities; the counter does not advance and no tensor is touched.
    pub fn apply_gradients(&self, grads: &GradientSet) -> Result<()> {
        self.validate_grad(grads)?;

        let step = self.step.fetch_add(1, Ordering::AcqRel) + 1;

        self.slots
            .par_iter()
            .zip(grads.grads.par_iter())
            .for_each(|(slot, grad)| {
                if let Some(grad) = grad {
                    slot.apply(step, grad);
                }
            });

        Ok(())
    }

    /// Copies the full shared parameter set into `out`, overwriting it whole.
    ///
    /// Snapshot policy: each tensor is copied under its own read lock and is
    /// never torn, but the snapshot is not point-in-time consistent across
    /// tensors while concurrent applies are in flight. A cross-tensor lock
    /// would serialize unrelated workers, so this best-effort policy is the
    /// deliberate choice.
    ///
    /// # Errors
    /// `SyncErr` if `out` doesn't match the store's tensor identities.
    pub fn pull_snapshot_into(&self, out: &mut ParameterSnapshot) -> Result<()> {
        if out.tensors.len() != self.slots.len() {
            return Err(SyncErr::TensorCount {
                got: out.tensors.len(),
                expected: self.slots.len(),
            });
        }

        for (index, (tensor, slot)) in out.tensors.iter().zip(self.slots.iter()).enumerate() {
            if tensor.len() != slot.len() {
                return Err(SyncErr::TensorLength {
                    index,
                    name: self.specs[index].name.clone(),
                    got: tensor.len(),
                    expected: slot.len(),
                });
            }
        }

        self.slots
            .par_iter()
            .zip(out.tensors.par_iter_mut())
            .for_each(|(slot, tensor)| slot.pull(&mut tensor.data));

        Ok(())
    }

    /// Allocates and pulls a fresh snapshot of the shared parameters.
    pub fn snapshot(&self) -> ParameterSnapshot {
        let mut out = ParameterSnapshot::new(
            self.specs
                .iter()
                .map(|spec| TensorData::zeros(spec.name.clone(), spec.shape.clone()))
                .collect(),
        );

        // Identities were built from the slots themselves, the pull cannot fail.
        let _ = self.pull_snapshot_into(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    struct AddOptimizer;

    impl Optimizer for AddOptimizer {
        fn update(&mut self, _step: u64, grad: &[f32], weights: &mut [f32]) {
            weights.iter_mut().zip(grad).for_each(|(w, g)| *w += g);
        }
    }

    fn create_test_store(sizes: &[usize]) -> SharedParameterStore<AddOptimizer> {
        let tensors = sizes
            .iter()
            .enumerate()
            .map(|(i, &len)| TensorData::zeros(format!("t{i}"), vec![len]))
            .collect();
        SharedParameterStore::new(ParameterSnapshot::new(tensors), |_| AddOptimizer)
    }

    fn full_grad(store: &SharedParameterStore<AddOptimizer>, value: f32) -> GradientSet {
        GradientSet::new(
            store
                .slots
                .iter()
                .map(|slot| Some(vec![value; slot.len()]))
                .collect(),
        )
    }

    #[test]
    fn test_counter_advances_once_per_apply() {
        let store = create_test_store(&[3, 5]);

        store.apply_gradients(&full_grad(&store, 1.)).unwrap();
        assert_eq!(store.step_count(), 1);

        // A partially null gradient set still counts as one apply call.
        store
            .apply_gradients(&GradientSet::new(vec![None, Some(vec![1.; 5])]))
            .unwrap();
        assert_eq!(store.step_count(), 2);
    }

    #[test]
    fn test_null_gradients_are_skipped() {
        let store = create_test_store(&[2, 2]);

        store
            .apply_gradients(&GradientSet::new(vec![Some(vec![1., 1.]), None]))
            .unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.tensors[0].data, [1., 1.]);
        assert_eq!(snap.tensors[1].data, [0., 0.]);
    }

    #[test]
    fn test_tensor_count_mismatch_is_fatal() {
        let store = create_test_store(&[2, 2]);
        let err = store
            .apply_gradients(&GradientSet::new(vec![Some(vec![1., 1.])]))
            .unwrap_err();

        assert!(matches!(err, SyncErr::TensorCount { got: 1, expected: 2 }));
        assert_eq!(store.step_count(), 0);
    }

    #[test]
    fn test_tensor_length_mismatch_is_fatal() {
        let store = create_test_store(&[2]);
        let err = store
            .apply_gradients(&GradientSet::new(vec![Some(vec![1., 1., 1.])]))
            .unwrap_err();

        assert!(matches!(err, SyncErr::TensorLength { index: 0, .. }));
        assert_eq!(store.step_count(), 0);
    }

    #[test]
    fn test_concurrent_applies_lose_no_updates() {
        const WORKERS: usize = 8;
        const APPLIES_PER_WORKER: usize = 50;

        let store = create_test_store(&[4]);

        thread::scope(|s| {
            for _ in 0..WORKERS {
                let store = store.clone();
                s.spawn(move || {
                    for _ in 0..APPLIES_PER_WORKER {
                        store.apply_gradients(&full_grad(&store, 1.)).unwrap();
                    }
                });
            }
        });

        let total = (WORKERS * APPLIES_PER_WORKER) as f32;
        assert_eq!(store.step_count(), total as u64);

        let snap = store.snapshot();
        assert_eq!(snap.tensors[0].data, [total; 4]);
    }

    #[test]
    fn test_concurrent_pull_never_observes_a_torn_tensor() {
        const APPLIES: usize = 200;

        let store = create_test_store(&[64]);

        // Every apply moves all 64 elements together under the slot's write
        // lock, so a pull under the read lock must see a uniform tensor; a
        // mixed tensor means the read tore mid-update.
        thread::scope(|s| {
            let writer = store.clone();
            s.spawn(move || {
                for _ in 0..APPLIES {
                    writer.apply_gradients(&full_grad(&writer, 1.)).unwrap();
                }
            });

            let reader = store.clone();
            s.spawn(move || {
                let mut local = reader.snapshot();
                for _ in 0..APPLIES {
                    reader.pull_snapshot_into(&mut local).unwrap();
                    let data = &local.tensors[0].data;
                    let first = data[0];
                    assert!(
                        data.iter().all(|&v| v == first),
                        "tensor mixed pre- and post-update values: {data:?}"
                    );
                }
            });
        });

        assert_eq!(store.step_count(), APPLIES as u64);
    }

    #[test]
    fn test_pull_overwrites_the_whole_snapshot() {
        let store = create_test_store(&[3]);
        store.apply_gradients(&full_grad(&store, 2.)).unwrap();

        let mut local = ParameterSnapshot::new(vec![TensorData::new(
            "t0",
            vec![3],
            vec![9., 9., 9.],
        )]);
        store.pull_snapshot_into(&mut local).unwrap();

        assert_eq!(local.tensors[0].data, [2., 2., 2.]);
        assert_eq!(local, store.snapshot());
    }
}
