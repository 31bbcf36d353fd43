use std::{
    error::Error,
    fmt::{self, Display},
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::parameters::ParameterSnapshot;

/// Where and how often the shared parameter snapshot is written.
#[derive(Debug, Clone)]
pub struct CheckpointConfig {
    /// Root directory holding one subdirectory per experiment.
    pub directory: PathBuf,
    /// Experiment name; keys the subdirectory and the checkpoint paths.
    pub experiment: String,
    /// Worker iterations between checkpoint writes.
    pub interval: NonZeroUsize,
}

impl CheckpointConfig {
    pub fn new(directory: impl Into<PathBuf>, experiment: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            experiment: experiment.into(),
            interval: NonZeroUsize::new(10_000).unwrap(),
        }
    }

    pub fn with_interval(mut self, interval: NonZeroUsize) -> Self {
        self.interval = interval;
        self
    }

    /// The stable path for the checkpoint of a given iteration.
    pub fn path(&self, iteration: usize) -> PathBuf {
        self.directory
            .join(&self.experiment)
            .join(format!("{iteration:07}.json"))
    }
}

/// Checkpoint I/O failures. Non-fatal: callers log and continue training.
#[derive(Debug)]
pub enum CheckpointErr {
    Io(io::Error),
    Encode(serde_json::Error),
}

impl Display for CheckpointErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointErr::Io(e) => write!(f, "checkpoint io error: {e}"),
            CheckpointErr::Encode(e) => write!(f, "checkpoint encode error: {e}"),
        }
    }
}

impl Error for CheckpointErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CheckpointErr::Io(e) => Some(e),
            CheckpointErr::Encode(e) => Some(e),
        }
    }
}

impl From<io::Error> for CheckpointErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CheckpointErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Writes `snapshot` to the stable path for `iteration`.
///
/// Idempotent: if the path already exists (another worker hit the same
/// iteration first) the write is skipped. The file lands via a temporary
/// unique to the writing worker plus a rename, so near-simultaneous triggers
/// never leave a torn or interleaved file at the stable path.
///
/// # Arguments
/// * `cfg` - Directory, experiment name and cadence.
/// * `iteration` - The worker iteration keying the path.
/// * `snapshot` - The shared parameter set to serialize.
///
/// # Returns
/// The stable path the checkpoint lives at.
pub fn write_checkpoint(
    cfg: &CheckpointConfig,
    iteration: usize,
    snapshot: &ParameterSnapshot,
) -> Result<PathBuf, CheckpointErr> {
    let path = cfg.path(iteration);

    if path.exists() {
        return Ok(path);
    }

    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;

    // Workers share the process, so the process id alone is not unique; the
    // sequence number keeps concurrent writers out of each other's temporary.
    static TMP_SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);

    let tmp = parent.join(format!(".{iteration:07}.{}-{seq}.tmp", process::id()));
    let file = File::create(&tmp)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, snapshot)?;
    writer.flush()?;
    fs::rename(&tmp, &path)?;

    Ok(path)
}

/// Loads a previously written checkpoint for resume or evaluation.
pub fn load_checkpoint(path: &Path) -> Result<ParameterSnapshot, CheckpointErr> {
    let file = File::open(path)?;
    let snapshot = serde_json::from_reader(BufReader::new(file))?;
    Ok(snapshot)
}
