use std::io::{self, ErrorKind, Read};

/// Bytes reads from a source that may time out. A read that produces no data, or fails
/// with [ErrorKind::TimedOut] or [ErrorKind::WouldBlock], is reported as "no data"
/// rather than an error so the caller can decide whether that is the end of the stream.
pub struct Bytes<R>
where
    R: Read + Send,
{
    reader: R,
    num_read: usize,
    buf: [u8; 1],
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

impl<R> Bytes<R>
where
    R: Read + Send,
{
    pub fn new(reader: R) -> Self {
        Bytes {
            reader,
            num_read: 0,
            buf: [0u8; 1],
        }
    }

    /// Read a single byte, or `None` if the source produced nothing before its timeout.
    pub fn next(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.reader.read(&mut self.buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.num_read += 1;
                    return Ok(Some(self.buf[0]));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => return Ok(None),
                Err(err) => return Err(err),
            }
        }
    }

    /// Read until `buf` is full or the source stops producing data. Returns the number of
    /// bytes placed in `buf`, which is less than `buf.len()` only if the source ran dry.
    pub fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => break,
                Err(err) => return Err(err),
            }
        }
        self.num_read += filled;
        Ok(filled)
    }

    /// Total number of bytes read from the source.
    pub fn offset(&self) -> usize {
        self.num_read
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
