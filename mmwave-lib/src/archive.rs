//! Raw frame archiving.
//!
//! Frames are written exactly as received so archives can be replayed through the same
//! decoder with [read_frames](crate::framing::read_frames).
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::report::{Diagnostic, Reporter};

/// Default directory archives are written to.
pub const DEFAULT_ARCHIVE_DIR: &str = "radar_data";
/// Default number of frames per archive file.
pub const DEFAULT_FRAMES_PER_FILE: usize = 100;

/// Session timestamp format used in archive file names.
pub const SESSION_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveOpts {
    #[builder(default = PathBuf::from(DEFAULT_ARCHIVE_DIR), setter(into))]
    pub dir: PathBuf,
    #[builder(default = DEFAULT_FRAMES_PER_FILE)]
    pub frames_per_file: usize,
}

impl Default for ArchiveOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Accumulates raw frames and writes them out every `frames_per_file` frames to
/// `<dir>/<session>_<sequence>.bin`.
///
/// Archiving is best-effort. Write failures are reported and the batch is discarded;
/// they never propagate to the caller.
pub struct Archiver {
    dir: PathBuf,
    frames_per_file: usize,
    session: String,
    buffer: Vec<u8>,
    pending: usize,
    frames: usize,
    /// Sequence number of the last file written or attempted.
    sequence: usize,
    reporter: Arc<dyn Reporter>,
}

impl Archiver {
    /// Create an archiver whose session name is the current local time.
    pub fn new(opts: ArchiveOpts, reporter: Arc<dyn Reporter>) -> Self {
        let session = Local::now().format(SESSION_FORMAT).to_string();
        Archiver {
            dir: opts.dir,
            frames_per_file: opts.frames_per_file.max(1),
            session,
            buffer: Vec::new(),
            pending: 0,
            frames: 0,
            sequence: 0,
            reporter,
        }
    }

    /// Override the session name used as the file name prefix.
    #[must_use]
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = session.into();
        self
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Total number of frames pushed.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Number of frames buffered but not yet written.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Path of the file with the given sequence number.
    pub fn path_for(&self, sequence: usize) -> PathBuf {
        self.dir.join(format!("{}_{sequence}.bin", self.session))
    }

    /// Add a frame, writing the batch if it is now full. Returns the path written, if
    /// a write succeeded.
    pub fn push(&mut self, frame: &[u8]) -> Option<PathBuf> {
        self.buffer.extend_from_slice(frame);
        self.pending += 1;
        self.frames += 1;
        if self.pending >= self.frames_per_file {
            return self.flush();
        }
        None
    }

    /// Write any buffered frames now, e.g., on shutdown. Every write, full or partial,
    /// takes the next sequence number.
    pub fn flush(&mut self) -> Option<PathBuf> {
        if self.pending == 0 {
            return None;
        }
        self.sequence += 1;
        let path = self.path_for(self.sequence);
        let frames = self.pending;
        let zult = write(&self.dir, &path, &self.buffer);
        self.buffer.clear();
        self.pending = 0;

        match zult {
            Ok(()) => {
                self.reporter
                    .report(Diagnostic::ArchiveWritten { path: path.clone(), frames });
                Some(path)
            }
            Err(err) => {
                self.reporter.report(Diagnostic::ArchiveFailed {
                    path,
                    error: err.to_string(),
                });
                None
            }
        }
    }
}

fn write(dir: &Path, path: &Path, dat: &[u8]) -> std::io::Result<()> {
    if !dir.exists() {
        debug!("creating archive directory {dir:?}");
        fs::create_dir_all(dir)?;
    }
    fs::write(path, dat)
}
