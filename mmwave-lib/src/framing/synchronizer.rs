use std::io::Read;

use tracing::trace;

use super::{header, FrameHeader, RawFrame, DEFAULT_MAX_PACKET_LENGTH, MAGIC_WORD, MIN_PACKET_LENGTH};
use crate::bytes::Bytes;
use crate::{Error, Result};

/// Synchronizer scans a byte stream for the [MAGIC_WORD] and reads the frame that
/// follows it.
///
/// Frames are located by matching the magic word byte-by-byte. A partial match that is
/// broken by a byte equal to the first byte of the magic word restarts matching at
/// that byte, so a stray near-match in garbage never hides the real magic word.
pub struct Synchronizer<R>
where
    R: Read + Send,
{
    bytes: Bytes<R>,
    max_packet_length: usize,
    /// Count of bytes skipped while scanning for the magic word.
    pub discarded: usize,
    /// Count of magic words found.
    pub synced: usize,
}

impl<R> Synchronizer<R>
where
    R: Read + Send,
{
    /// Creates a new ``Synchronizer`` accepting frames up to
    /// [DEFAULT_MAX_PACKET_LENGTH](super::DEFAULT_MAX_PACKET_LENGTH) bytes.
    pub fn new(reader: R) -> Self {
        Synchronizer {
            bytes: Bytes::new(reader),
            max_packet_length: DEFAULT_MAX_PACKET_LENGTH,
            discarded: 0,
            synced: 0,
        }
    }

    /// Reject frames declaring a `total_packet_length` above `max`.
    #[must_use]
    pub fn with_max_packet_length(mut self, max: usize) -> Self {
        self.max_packet_length = max.max(FrameHeader::LEN);
        self
    }

    /// Scan until the magic word has been read and return a buffer containing it, to be
    /// passed to [Synchronizer::frame].
    ///
    /// # Errors
    /// [Error::SyncTimeout] if the source produces no data before the magic word is
    /// complete; any partial match is abandoned. Other I/O errors are passed through.
    pub fn scan(&mut self) -> Result<Vec<u8>> {
        let start = self.bytes.offset();
        let mut idx = 0;
        let mut working: Vec<u8> = Vec::with_capacity(MAGIC_WORD.len());

        while idx < MAGIC_WORD.len() {
            let Some(b) = self.bytes.next()? else {
                self.discarded += self.bytes.offset() - start;
                return Err(Error::SyncTimeout);
            };

            if b == MAGIC_WORD[idx] {
                working.push(b);
                idx += 1;
            } else if idx > 0 && b == MAGIC_WORD[0] {
                working.clear();
                working.push(b);
                idx = 1;
            } else {
                working.clear();
                idx = 0;
            }
        }

        let skipped = self.bytes.offset() - start - MAGIC_WORD.len();
        self.discarded += skipped;
        self.synced += 1;
        trace!(skipped, offset = self.bytes.offset(), "synchronized");

        Ok(working)
    }

    /// Read the rest of the frame following a magic word returned by
    /// [Synchronizer::scan].
    ///
    /// # Errors
    /// [Error::TruncatedFrame] if the source runs dry before the declared length is read,
    /// [Error::MalformedHeader] if the declared length is below the minimum, above the
    /// configured maximum, or too short to contain the header.
    pub fn frame(&mut self, mut buf: Vec<u8>) -> Result<RawFrame> {
        let sync_len = buf.len();
        buf.resize(MIN_PACKET_LENGTH, 0);
        let n = self.bytes.fill(&mut buf[sync_len..])?;
        if sync_len + n < MIN_PACKET_LENGTH {
            return Err(Error::TruncatedFrame {
                expected: MIN_PACKET_LENGTH,
                actual: sync_len + n,
            });
        }

        let total = header::TOTAL_PACKET_LENGTH.u32(&buf) as usize;
        if total < MIN_PACKET_LENGTH {
            return Err(Error::MalformedHeader(format!(
                "total packet length {total} is less than {MIN_PACKET_LENGTH}"
            )));
        }
        if total > self.max_packet_length {
            return Err(Error::MalformedHeader(format!(
                "total packet length {total} exceeds maximum {}",
                self.max_packet_length
            )));
        }

        buf.reserve_exact(total - MIN_PACKET_LENGTH);
        buf.resize(total, 0);
        let n = self.bytes.fill(&mut buf[MIN_PACKET_LENGTH..])?;
        if n < total - MIN_PACKET_LENGTH {
            return Err(Error::TruncatedFrame {
                expected: total,
                actual: MIN_PACKET_LENGTH + n,
            });
        }
        if total < FrameHeader::LEN {
            return Err(Error::MalformedHeader(format!(
                "total packet length {total} is shorter than the {} byte header",
                FrameHeader::LEN
            )));
        }

        RawFrame::new(buf)
    }

    /// Scan for the next magic word and read its frame.
    ///
    /// # Errors
    /// See [Synchronizer::scan] and [Synchronizer::frame].
    pub fn next_frame(&mut self) -> Result<RawFrame> {
        let buf = self.scan()?;
        self.frame(buf)
    }

    /// Total number of bytes read from the source.
    pub fn offset(&self) -> usize {
        self.bytes.offset()
    }

    /// Give back the source.
    pub fn into_inner(self) -> R {
        self.bytes.into_inner()
    }
}

impl<R> IntoIterator for Synchronizer<R>
where
    R: Read + Send,
{
    type Item = Result<RawFrame>;
    type IntoIter = FrameIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        FrameIter { sync: self }
    }
}

/// Iterates over the frames of a finite source. Created using
/// ``Synchronizer::into_iter``.
///
/// ## Errors
/// A [Error::SyncTimeout] is taken to mean the source is exhausted and simply ends the
/// iterator. Any other error is passed on, and iteration may continue afterwards.
pub struct FrameIter<R>
where
    R: Read + Send,
{
    sync: Synchronizer<R>,
}

impl<R> FrameIter<R>
where
    R: Read + Send,
{
    /// The underlying synchronizer, e.g., for its counters.
    pub fn synchronizer(&self) -> &Synchronizer<R> {
        &self.sync
    }
}

impl<R> Iterator for FrameIter<R>
where
    R: Read + Send,
{
    type Item = Result<RawFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.sync.next_frame() {
            Ok(frame) => Some(Ok(frame)),
            Err(Error::SyncTimeout) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

/// Creates an iterator over the frames in `reader`, e.g., an archive file.
///
/// Garbage between frames is skipped. Frames that fail to read produce an `Err` and
/// iteration continues with the next magic word. For more control see [Synchronizer].
pub fn read_frames<'a, R>(reader: R) -> impl Iterator<Item = Result<RawFrame>> + 'a
where
    R: Read + Send + 'a,
{
    Synchronizer::new(reader).into_iter()
}
