//! Background decoding of a live byte source.
//!
//! [spawn] starts a worker thread that owns the source and runs
//! synchronize → read frame → decode → send in a loop, optionally archiving every raw
//! frame. Decoded frames are delivered in arrival order over a crossbeam channel.
//!
//! The output channel is unbounded by default: the worker never waits on a slow
//! consumer, so a consumer that falls behind accumulates frames in memory instead of
//! stalling the live stream. Setting [PipelineOpts::capacity] bounds memory instead;
//! the worker still never blocks, and frames that do not fit are dropped and reported.
//!
//! The stop flag is checked once per frame attempt. A read in progress is bounded by the
//! source's own timeout, so stopping takes at most about one timeout interval. The
//! source is handed back from [Worker::join] only after the thread has exited.
use std::{
    io::Read,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam::channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

use crate::archive::{ArchiveOpts, Archiver};
use crate::framing::{FrameDecoder, PointCloudFrame, Synchronizer, DEFAULT_MAX_PACKET_LENGTH};
use crate::report::{Diagnostic, Reporter};
use crate::tracking::TargetAssociator;
use crate::{Error, Result};

#[derive(Debug, Clone, TypedBuilder)]
pub struct PipelineOpts {
    /// Frames declaring a larger total length are rejected.
    #[builder(default = DEFAULT_MAX_PACKET_LENGTH)]
    pub max_packet_length: usize,
    /// Archive raw frames when set.
    #[builder(default)]
    pub archive: Option<ArchiveOpts>,
    /// Hold each frame back until the next one supplies its target indices.
    #[builder(default)]
    pub associate_targets: bool,
    /// Bound the output channel. Unbounded when `None`.
    #[builder(default)]
    pub capacity: Option<usize>,
    /// Pause after an unexpected error before trying again.
    #[builder(default = Duration::from_millis(100))]
    pub error_pause: Duration,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Default)]
struct Control {
    stop: AtomicBool,
    paused: AtomicBool,
}

/// Handle to a running decode worker.
///
/// Dropping the handle stops and joins the worker, dropping the source.
pub struct Worker<R>
where
    R: Send + 'static,
{
    control: Arc<Control>,
    handle: Option<JoinHandle<R>>,
}

impl<R> Worker<R>
where
    R: Send + 'static,
{
    /// Ask the worker to exit after its current frame attempt.
    pub fn stop(&self) {
        self.control.stop.store(true, Ordering::Relaxed);
    }

    /// Keep reading and archiving, but stop emitting frames.
    pub fn pause(&self) {
        self.control.paused.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.control.paused.store(false, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.control.paused.load(Ordering::Relaxed)
    }

    /// True once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the worker, wait for it to exit and return the source.
    ///
    /// # Errors
    /// [Error::WorkerPanicked] if the worker thread panicked.
    pub fn join(mut self) -> Result<R> {
        self.stop();
        let handle = self.handle.take().ok_or(Error::WorkerPanicked)?;
        handle.join().map_err(|_| Error::WorkerPanicked)
    }
}

impl<R> Drop for Worker<R>
where
    R: Send + 'static,
{
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop();
            let _ = handle.join();
        }
    }
}

/// Start decoding `source` on a new thread.
///
/// Returns the worker handle and the receiving end of the output channel. The channel
/// disconnects when the worker exits.
///
/// # Errors
/// If the thread cannot be spawned.
pub fn spawn<R>(
    source: R,
    opts: PipelineOpts,
    reporter: Arc<dyn Reporter>,
) -> Result<(Worker<R>, Receiver<PointCloudFrame>)>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = match opts.capacity {
        Some(cap) => bounded(cap.max(1)),
        None => unbounded(),
    };
    let control = Arc::new(Control::default());

    let handle = {
        let control = control.clone();
        thread::Builder::new()
            .name("mmwave-decode".into())
            .spawn(move || run(source, opts, reporter, &tx, &control))?
    };
    debug!("decode worker started");

    Ok((
        Worker {
            control,
            handle: Some(handle),
        },
        rx,
    ))
}

fn send(tx: &Sender<PointCloudFrame>, frame: PointCloudFrame, reporter: &dyn Reporter) {
    match tx.try_send(frame) {
        Ok(()) => {}
        Err(TrySendError::Full(frame)) => reporter.report(Diagnostic::FrameDropped {
            frame_number: frame.frame_number,
        }),
        Err(TrySendError::Disconnected(frame)) => {
            trace!(frame = frame.frame_number, "no consumer; frame discarded");
        }
    }
}

fn run<R>(
    source: R,
    opts: PipelineOpts,
    reporter: Arc<dyn Reporter>,
    tx: &Sender<PointCloudFrame>,
    control: &Control,
) -> R
where
    R: Read + Send,
{
    let mut sync = Synchronizer::new(source).with_max_packet_length(opts.max_packet_length);
    let decoder = FrameDecoder::new(reporter.clone());
    let mut archiver = opts
        .archive
        .map(|archive| Archiver::new(archive, reporter.clone()));
    let reporter = reporter.as_ref();
    let mut associator = opts
        .associate_targets
        .then(|| TargetAssociator::new(reporter));

    while !control.stop.load(Ordering::Relaxed) {
        let discarded = sync.discarded;
        match sync.next_frame() {
            Ok(raw) => {
                if sync.discarded > discarded {
                    reporter.report(Diagnostic::Resynchronized {
                        discarded: sync.discarded - discarded,
                    });
                }
                if let Some(archiver) = archiver.as_mut() {
                    archiver.push(&raw.data);
                }
                if control.paused.load(Ordering::Relaxed) {
                    continue;
                }
                let frame = decoder.decode(&raw);
                let frame = match associator.as_mut() {
                    Some(associator) => associator.push(frame),
                    None => Some(frame),
                };
                if let Some(frame) = frame {
                    send(tx, frame, reporter);
                }
            }
            Err(Error::SyncTimeout) => reporter.report(Diagnostic::SyncTimeout {
                discarded: sync.discarded - discarded,
            }),
            Err(err) if err.is_frame_error() => reporter.report(Diagnostic::from(&err)),
            Err(err) => {
                reporter.report(Diagnostic::WorkerError {
                    error: err.to_string(),
                });
                thread::sleep(opts.error_pause);
            }
        }
    }

    if let Some(frame) = associator.as_mut().and_then(TargetAssociator::finish) {
        send(tx, frame, reporter);
    }
    if let Some(archiver) = archiver.as_mut() {
        archiver.flush();
    }
    debug!("decode worker exit");
    sync.into_inner()
}
