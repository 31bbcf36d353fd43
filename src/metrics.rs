use log::info;
use parking_lot::Mutex;

/// A sink for named scalar time series indexed by iteration.
///
/// Implementations must be cheap enough never to block training; workers call
/// into the sink from their hot loop.
pub trait MetricsSink: Send + Sync {
    fn scalar(&self, name: &str, iteration: usize, value: f32);
}

/// Discards every scalar. The default when no observer is attached.
#[derive(Debug, Default)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn scalar(&self, _name: &str, _iteration: usize, _value: f32) {}
}

/// Forwards scalars as structured log records under the `metrics` target.
#[derive(Debug, Default)]
pub struct LogSink;

impl MetricsSink for LogSink {
    fn scalar(&self, name: &str, iteration: usize, value: f32) {
        info!(target: "metrics", name = name, iteration = iteration, value = value as f64; "scalar");
    }
}

/// Buffers scalars in memory. Meant for tests and evaluation tooling.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(String, usize, f32)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All scalars recorded so far, in arrival order.
    pub fn records(&self) -> Vec<(String, usize, f32)> {
        self.records.lock().clone()
    }

    /// The recorded values of a single series, in arrival order.
    pub fn series(&self, name: &str) -> Vec<(usize, f32)> {
        self.records
            .lock()
            .iter()
            .filter(|(n, _, _)| n == name)
            .map(|&(_, i, v)| (i, v))
            .collect()
    }
}

impl MetricsSink for MemorySink {
    fn scalar(&self, name: &str, iteration: usize, value: f32) {
        self.records.lock().push((name.to_string(), iteration, value));
    }
}
