//! Diagnostics reporting.
//!
//! Every component that absorbs an error instead of returning it hands a [Diagnostic] to
//! a [Reporter]. The default [TracingReporter] turns them into `tracing` events, while
//! [CollectingReporter] keeps them around so tests can assert on exactly what was seen.
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use tracing::{debug, error, info, warn};

use crate::Error;

/// A recoverable condition encountered while decoding the stream.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Diagnostic {
    /// The source timed out before a magic word was found.
    SyncTimeout { discarded: usize },
    /// A magic word was found after skipping `discarded` bytes of garbage.
    Resynchronized { discarded: usize },
    TruncatedFrame { expected: usize, actual: usize },
    MalformedHeader { reason: String },
    /// A TLV declared more bytes than remain; the rest of the walk was abandoned.
    MalformedTlv {
        frame_number: u32,
        tlv_type: u32,
        declared: usize,
        remaining: usize,
    },
    /// Fewer bytes than a TLV header remained before all declared TLVs were walked.
    TlvWalkEnded {
        frame_number: u32,
        walked: u32,
        declared: u32,
        remaining: usize,
    },
    UnknownTlv {
        frame_number: u32,
        tlv_type: u32,
        length: usize,
    },
    /// A payload length was not a whole number of records; the tail was ignored.
    PartialRecord {
        tlv_type: u32,
        record_size: usize,
        leftover: usize,
    },
    /// A payload too short to hold its decompression units.
    MissingUnits { tlv_type: u32, length: usize },
    PointSkipped {
        tlv_type: u32,
        index: usize,
        reason: String,
    },
    /// Target indices did not line up with the points of the frame they refer to.
    TargetIndexMismatch {
        frame_number: u32,
        points: usize,
        indices: usize,
    },
    /// The bounded output channel was full and the frame was dropped.
    FrameDropped { frame_number: u32 },
    ArchiveWritten { path: PathBuf, frames: usize },
    ArchiveFailed { path: PathBuf, error: String },
    /// An unexpected error from one decode worker iteration.
    WorkerError { error: String },
}

impl From<&Error> for Diagnostic {
    fn from(err: &Error) -> Self {
        match err {
            Error::SyncTimeout => Diagnostic::SyncTimeout { discarded: 0 },
            Error::TruncatedFrame { expected, actual } => Diagnostic::TruncatedFrame {
                expected: *expected,
                actual: *actual,
            },
            Error::MalformedHeader(reason) => Diagnostic::MalformedHeader {
                reason: reason.clone(),
            },
            err => Diagnostic::WorkerError {
                error: err.to_string(),
            },
        }
    }
}

/// Receiver of diagnostics. Implementations must be cheap; they are called inline from
/// the decode loop.
pub trait Reporter: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Reports diagnostics as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::SyncTimeout { discarded } => {
                debug!(discarded, "timeout waiting for magic word");
            }
            Diagnostic::Resynchronized { discarded } => {
                debug!(discarded, "resynchronized");
            }
            Diagnostic::TruncatedFrame { expected, actual } => {
                warn!(expected, actual, "truncated frame dropped");
            }
            Diagnostic::MalformedHeader { reason } => {
                warn!("malformed frame header dropped: {reason}");
            }
            Diagnostic::MalformedTlv {
                frame_number,
                tlv_type,
                declared,
                remaining,
            } => warn!(
                frame_number,
                tlv_type, declared, remaining, "malformed TLV; abandoning rest of frame"
            ),
            Diagnostic::TlvWalkEnded {
                frame_number,
                walked,
                declared,
                remaining,
            } => warn!(
                frame_number,
                walked, declared, remaining, "incomplete TLV header; frame ended early"
            ),
            Diagnostic::UnknownTlv {
                frame_number,
                tlv_type,
                length,
            } => debug!(frame_number, tlv_type, length, "skipping unknown TLV"),
            Diagnostic::PartialRecord {
                tlv_type,
                record_size,
                leftover,
            } => warn!(
                tlv_type,
                record_size, leftover, "incomplete record data in TLV"
            ),
            Diagnostic::MissingUnits { tlv_type, length } => {
                warn!(tlv_type, length, "TLV too short for decompression units");
            }
            Diagnostic::PointSkipped {
                tlv_type,
                index,
                reason,
            } => warn!(tlv_type, index, "skipping point: {reason}"),
            Diagnostic::TargetIndexMismatch {
                frame_number,
                points,
                indices,
            } => error!(
                frame_number,
                points, indices, "target indices don't match expected number of points"
            ),
            Diagnostic::FrameDropped { frame_number } => {
                warn!(frame_number, "output channel full; frame dropped");
            }
            Diagnostic::ArchiveWritten { path, frames } => {
                info!("saved {frames} frames to {path:?}");
            }
            Diagnostic::ArchiveFailed { path, error } => {
                error!("failed to archive frames to {path:?}: {error}");
            }
            Diagnostic::WorkerError { error } => error!("error in decode worker: {error}"),
        }
    }
}

/// Captures diagnostics in memory. Clones share the same storage.
#[derive(Debug, Default, Clone)]
pub struct CollectingReporter {
    seen: Arc<Mutex<Vec<Diagnostic>>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All diagnostics reported so far, in report order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of reported diagnostics matching `pred`.
    pub fn count<F>(&self, pred: F) -> usize
    where
        F: Fn(&Diagnostic) -> bool,
    {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| pred(d))
            .count()
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, diagnostic: Diagnostic) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}
