use crate::error::{Error, Result};
use crate::hasher::RunIdentity;
use crate::state::EngineState;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, trace};

/// Suffix of checkpoint files; traversal skips anything ending with it.
pub const CHECKPOINT_EXTENSION: &str = "organizer-checkpoint";
const TEMP_SUFFIX: &str = ".organizer-checkpoint.tmp";
const TEMP_PREFIX: &str = ".";

const MAGIC: &[u8; 8] = b"DDORGCKP";
const FORMAT_VERSION: u32 = 1;

/// True for checkpoint files and for temp files left behind by an
/// interrupted save.
pub fn is_checkpoint_artifact(file_name: &str) -> bool {
    file_name.ends_with(&format!(".{}", CHECKPOINT_EXTENSION)) || file_name.ends_with(TEMP_SUFFIX)
}

/// Atomic on-disk persistence of [`EngineState`], one file per [`RunIdentity`].
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn locate(&self, identity: &RunIdentity) -> PathBuf {
        self.dir
            .join(format!("{}.{}", identity.as_str(), CHECKPOINT_EXTENSION))
    }

    /// `Ok(None)` when no checkpoint exists at `path`.
    pub fn load(&self, path: &Path) -> Result<Option<EngineState>> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io_at(path, e)),
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| Error::io_at(path, e))?;

        let corrupt = |reason: String| Error::CorruptCheckpoint {
            path: path.to_path_buf(),
            reason,
        };

        if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
            return Err(corrupt("missing checkpoint header".to_string()));
        }

        let (version, state): (u32, EngineState) = bincode::deserialize(&bytes[MAGIC.len()..])
            .map_err(|e| corrupt(e.to_string()))?;
        if version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }

        debug!(
            "Loaded checkpoint {} ({} processed, complete: {})",
            path.display(),
            state.processed_paths.len(),
            state.complete
        );
        Ok(Some(state))
    }

    /// Write `state` next to `path` and rename it into place.
    pub fn save(&self, path: &Path, state: &EngineState) -> Result<()> {
        self.stage(path, state)?.commit()
    }

    /// First half of [`save`](Self::save): the snapshot is fully written and
    /// synced to a temp file in the same directory, but `path` is untouched
    /// until [`StagedCheckpoint::commit`]. Dropping the stage removes the temp
    /// file.
    pub fn stage(&self, path: &Path, state: &EngineState) -> Result<StagedCheckpoint> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(self.dir.as_path());

        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(parent)
            .map_err(|e| Error::io_at(parent, e))?;

        {
            let mut writer = BufWriter::new(temp.as_file());
            writer
                .write_all(MAGIC)
                .map_err(|e| Error::io_at(temp.path(), e))?;
            bincode::serialize_into(&mut writer, &(FORMAT_VERSION, state))?;
            writer.flush().map_err(|e| Error::io_at(temp.path(), e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| Error::io_at(temp.path(), e))?;

        Ok(StagedCheckpoint {
            temp,
            target: path.to_path_buf(),
        })
    }

    /// Remove the checkpoint at `path`; missing files are not an error.
    pub fn discard(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Discarded checkpoint {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io_at(path, e)),
        }
    }
}

/// A fully written snapshot waiting to replace the canonical checkpoint.
pub struct StagedCheckpoint {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedCheckpoint {
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    pub fn commit(self) -> Result<()> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| Error::io_at(&target, e.error))?;
        sync_parent_dir(&target)?;
        trace!("Checkpoint saved to {}", target.display());
        Ok(())
    }
}

/// Makes the rename itself durable.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(parent)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| Error::io_at(parent, e))
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
