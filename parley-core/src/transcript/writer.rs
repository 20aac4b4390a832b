//! Transcript files on disk

use super::record::{render_text, TranscriptRecord};
use crate::session::Session;
use crate::utils::{file_timestamp, safe_filename};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Paths written by one persistence call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptPaths {
    pub text: PathBuf,
    pub json: PathBuf,
}

/// Writes `<session_id>_<timestamp>.txt` / `.json` pairs into one directory
#[derive(Debug, Clone)]
pub struct TranscriptWriter {
    dir: PathBuf,
}

impl TranscriptWriter {
    /// Create a writer, creating `dir` if it does not exist yet
    pub fn new<P: AsRef<Path>>(dir: P) -> crate::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Target directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a new text/JSON pair for the current state of `session`
    pub fn persist(&self, session: &Session) -> crate::Result<TranscriptPaths> {
        let now = chrono::Local::now();
        let stem = self.unused_stem(&format!(
            "{}_{}",
            safe_filename(&session.id),
            file_timestamp(now)
        ));
        let paths = TranscriptPaths {
            text: self.dir.join(format!("{}.txt", stem)),
            json: self.dir.join(format!("{}.json", stem)),
        };

        std::fs::write(&paths.text, render_text(session, now))?;
        std::fs::write(
            &paths.json,
            TranscriptRecord::from_session(session, now).to_json()?,
        )?;

        debug!(
            "Persisted {} messages of session {} to {}",
            session.conversation().len(),
            session.id,
            paths.json.display()
        );
        Ok(paths)
    }

    /// `base`, or `base-N` when a transcript with that stem already exists
    fn unused_stem(&self, base: &str) -> String {
        let taken = |stem: &str| {
            self.dir.join(format!("{}.json", stem)).exists()
                || self.dir.join(format!("{}.txt", stem)).exists()
        };

        if !taken(base) {
            return base.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}
