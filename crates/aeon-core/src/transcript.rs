//! Conversation memory: a bounded, ordered list of user/assistant turns.
//!
//! On disk the transcript is a bare JSON array. Exactly one shape is valid, so anything
//! else (a mapping, a malformed entry, broken encoding) is treated as absent and reset.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// Turns kept after every save; older turns are dropped first.
pub const TRANSCRIPT_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Opaque file descriptors sent with a user turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<serde_json::Value>,
}

impl Turn {
    pub fn user(content: impl Into<String>, files: Vec<serde_json::Value>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            files,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript(Vec<Turn>);

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.0.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The most recent `limit` turns, oldest first.
    pub fn recent(&self, limit: usize) -> Transcript {
        let skip = self.0.len().saturating_sub(limit);
        Transcript(self.0[skip..].to_vec())
    }
}

impl From<Vec<Turn>> for Transcript {
    fn from(turns: Vec<Turn>) -> Self {
        Transcript(turns)
    }
}

impl IntoIterator for Transcript {
    type Item = Turn;
    type IntoIter = std::vec::IntoIter<Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Backing storage for the single conversation.
///
/// `load` never fails: absent or corrupted storage reads as an empty transcript.
/// `save` keeps only the newest turns up to the store's limit.
pub trait ConversationStore: Send + Sync {
    fn load(&self) -> Transcript;

    fn save(&self, transcript: &Transcript) -> Result<()>;

    fn clear(&self) -> Result<()> {
        self.save(&Transcript::new())
    }
}

/// JSON file store. Writes go to a temp file in the same directory and are renamed into
/// place, so readers see either the old or the new file.
pub struct JsonFileStore {
    path: PathBuf,
    limit: usize,
}

impl JsonFileStore {
    /// Open the store, creating the parent directory and repairing a corrupted file.
    pub fn open(path: impl AsRef<Path>, limit: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self { path, limit };
        store.startup_check();
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn startup_check(&self) {
        if !self.path.exists() {
            return;
        }
        if let Err(reason) = self.read() {
            warn!(path = %self.path.display(), %reason, "Startup: cleaning corrupted memory file");
            self.reset();
        }
    }

    fn read(&self) -> std::result::Result<Transcript, String> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| e.to_string())?;
        serde_json::from_str::<Transcript>(&raw).map_err(|e| e.to_string())
    }

    fn reset(&self) {
        if let Err(e) = self.write(&Transcript::new()) {
            warn!(path = %self.path.display(), error = %e, "Failed to reset memory file");
        }
    }

    fn write(&self, transcript: &Transcript) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, transcript)?;
        tmp.as_file_mut().flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

impl ConversationStore for JsonFileStore {
    fn load(&self) -> Transcript {
        if !self.path.exists() {
            info!(path = %self.path.display(), "Memory file not found; starting empty");
            return Transcript::new();
        }
        match self.read() {
            Ok(transcript) => transcript,
            Err(reason) => {
                warn!(path = %self.path.display(), %reason, "Memory file corrupted; resetting");
                self.reset();
                Transcript::new()
            }
        }
    }

    fn save(&self, transcript: &Transcript) -> Result<()> {
        let kept = transcript.recent(self.limit);
        self.write(&kept)?;
        info!(turns = kept.len(), "Memory saved");
        Ok(())
    }
}

/// In-process store for tests and for deployments without a writable disk.
pub struct MemoryStore {
    transcript: Mutex<Transcript>,
    limit: usize,
}

impl MemoryStore {
    pub fn new(limit: usize) -> Self {
        Self {
            transcript: Mutex::new(Transcript::new()),
            limit,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(TRANSCRIPT_LIMIT)
    }
}

impl ConversationStore for MemoryStore {
    fn load(&self) -> Transcript {
        self.transcript
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn save(&self, transcript: &Transcript) -> Result<()> {
        *self
            .transcript
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = transcript.recent(self.limit);
        Ok(())
    }
}
