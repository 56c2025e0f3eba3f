//! In-memory stand-in for a serial port.
use std::{
    collections::VecDeque,
    io::{self, Read, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
    time::Duration,
};

use super::CommandPort;
use crate::Result;

/// A duplex port backed by memory. Clones share state, so a test can keep a clone to
/// inject input and inspect output while another owner reads and writes.
///
/// Reads with no data pending wait for the configured read delay and return 0 bytes,
/// like a serial port read that timed out.
#[derive(Clone)]
pub struct MockPort {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    read: VecDeque<u8>,
    written: Vec<u8>,
    auto_ack: Option<Vec<u8>>,
    baud_rates: Vec<u32>,
    clears: usize,
    read_delay: Duration,
}

impl Default for MockPort {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPort {
    pub fn new() -> Self {
        MockPort {
            inner: Arc::new(Mutex::new(Inner {
                read: VecDeque::new(),
                written: Vec::new(),
                auto_ack: None,
                baud_rates: Vec::new(),
                clears: 0,
                read_delay: Duration::from_millis(1),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `ack` for reading every time a full line is written.
    #[must_use]
    pub fn with_auto_ack(self, ack: &[u8]) -> Self {
        self.lock().auto_ack = Some(ack.to_vec());
        self
    }

    /// How long an empty read blocks before returning 0.
    #[must_use]
    pub fn with_read_delay(self, delay: Duration) -> Self {
        self.lock().read_delay = delay;
        self
    }

    /// Queue data to be read.
    pub fn inject(&self, dat: &[u8]) {
        self.lock().read.extend(dat);
    }

    /// Number of bytes queued for reading.
    pub fn available(&self) -> usize {
        self.lock().read.len()
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Baud rates set, in order.
    pub fn baud_rates(&self) -> Vec<u32> {
        self.lock().baud_rates.clone()
    }

    /// Number of times the input buffer was cleared.
    pub fn clears(&self) -> usize {
        self.lock().clears
    }
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.lock();
        if inner.read.is_empty() {
            let delay = inner.read_delay;
            drop(inner);
            thread::sleep(delay);
            return Ok(0);
        }
        let n = inner.read.len().min(buf.len());
        for (dst, src) in buf.iter_mut().zip(inner.read.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl Write for MockPort {
    fn write(&mut self, dat: &[u8]) -> io::Result<usize> {
        let mut inner = self.lock();
        inner.written.extend_from_slice(dat);
        let lines = dat.iter().filter(|b| **b == b'\n').count();
        if let Some(ack) = inner.auto_ack.clone() {
            for _ in 0..lines {
                inner.read.extend(&ack);
            }
        }
        Ok(dat.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CommandPort for MockPort {
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        self.lock().baud_rates.push(baud_rate);
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        let mut inner = self.lock();
        inner.read.clear();
        inner.clears += 1;
        Ok(())
    }
}
