use crate::device::Channel;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Not enough bytes")]
    NotEnoughData { actual: usize, minimum: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serial(#[from] serialport::Error),

    /// A command or data channel could not be opened.
    #[error("failed to open {channel} channel {port}: {source}")]
    Connection {
        channel: Channel,
        port: String,
        source: serialport::Error,
    },
    /// A configuration line could not be sent, acknowledged or applied.
    #[error("failed to send config line {line:?}: {reason}")]
    ConfigSend { line: String, reason: String },

    /// No magic word was found before the source read timed out.
    #[error("timed out waiting for magic word")]
    SyncTimeout,
    /// The source was exhausted before the declared packet length was read.
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    TruncatedFrame { expected: usize, actual: usize },
    #[error("malformed frame header: {0}")]
    MalformedHeader(String),
    /// A TLV declared more payload than remains in the frame.
    #[error("malformed TLV type {tlv_type}: declared {declared} bytes but {remaining} remain")]
    MalformedTlv {
        tlv_type: u32,
        declared: usize,
        remaining: usize,
    },
    /// A single point record could not be decoded.
    #[error("point decode failed: {0}")]
    Decode(String),

    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
    #[error("decode worker panicked")]
    WorkerPanicked,
}

impl Error {
    /// True for conditions that only cost the current frame attempt. The stream is
    /// expected to resynchronize on the next magic word without any delay.
    #[must_use]
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            Self::SyncTimeout
                | Self::TruncatedFrame { .. }
                | Self::MalformedHeader(_)
                | Self::MalformedTlv { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
