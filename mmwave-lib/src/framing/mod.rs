//! Frame level decoding of the sensor's UART data stream.
//!
//! A frame on the wire is a 40 byte little-endian [FrameHeader], starting with the
//! [MAGIC_WORD], followed by `num_tlvs` TLV records. [Synchronizer] locates frames in a
//! byte stream, [TlvWalker] iterates their records, and [FrameDecoder] turns them into
//! [PointCloudFrame]s.
mod builder;
mod decoder;
mod synchronizer;
mod tlv;

use serde::{Deserialize, Serialize};

use crate::layout::{Field, Kind, Layout};
use crate::{Error, Result};

pub use builder::FrameBuilder;
pub use decoder::{FrameDecoder, PointCloudFrame, Tracking};
pub use synchronizer::{read_frames, FrameIter, Synchronizer};
pub use tlv::{Tlv, TlvHeader, TlvType, TlvWalker};

/// Marks the start of every frame.
pub const MAGIC_WORD: [u8; 8] = [0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07];

/// Largest `total_packet_length` accepted by default.
pub const DEFAULT_MAX_PACKET_LENGTH: usize = 65_536;

/// Magic word plus the version and length fields. A frame declaring less than this is
/// rejected before any more bytes are read.
pub const MIN_PACKET_LENGTH: usize = 16;

pub(crate) mod header {
    use super::{Field, Kind, Layout};

    pub const MAGIC: Field = Field::new("magic", 0, Kind::Bytes(8));
    pub const VERSION: Field = Field::new("version", 8, Kind::U32);
    pub const TOTAL_PACKET_LENGTH: Field = Field::new("total_packet_length", 12, Kind::U32);
    pub const PLATFORM: Field = Field::new("platform", 16, Kind::U32);
    pub const FRAME_NUMBER: Field = Field::new("frame_number", 20, Kind::U32);
    pub const CPU_CYCLES: Field = Field::new("cpu_cycles", 24, Kind::U32);
    pub const NUM_DETECTED_OBJ: Field = Field::new("num_detected_obj", 28, Kind::U32);
    pub const NUM_TLVS: Field = Field::new("num_tlvs", 32, Kind::U32);
    pub const SUBFRAME_NUMBER: Field = Field::new("subframe_number", 36, Kind::U32);

    pub const LAYOUT: Layout = Layout::new(
        "frame header",
        40,
        &[
            MAGIC,
            VERSION,
            TOTAL_PACKET_LENGTH,
            PLATFORM,
            FRAME_NUMBER,
            CPU_CYCLES,
            NUM_DETECTED_OBJ,
            NUM_TLVS,
            SUBFRAME_NUMBER,
        ],
    );
    const _: () = LAYOUT.check();
}

/// Header found at the start of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameHeader {
    pub version: u32,
    /// Length of the entire frame in bytes, including this header.
    pub total_packet_length: u32,
    pub platform: u32,
    pub frame_number: u32,
    pub cpu_cycles: u32,
    /// Advisory count of detected points.
    pub num_detected_obj: u32,
    pub num_tlvs: u32,
    pub subframe_number: u32,
}

impl FrameHeader {
    /// Encoded length of the header, including the magic word.
    pub const LEN: usize = header::LAYOUT.size;

    /// Decode a header from the first [FrameHeader::LEN] bytes of `dat`, which must start
    /// with the magic word.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if `dat` is too short and [Error::MalformedHeader] if it
    /// does not start with [MAGIC_WORD].
    pub fn decode(dat: &[u8]) -> Result<Self> {
        if dat.len() < Self::LEN {
            return Err(Error::NotEnoughData {
                actual: dat.len(),
                minimum: Self::LEN,
            });
        }
        if dat[..MAGIC_WORD.len()] != MAGIC_WORD {
            return Err(Error::MalformedHeader(format!(
                "bad magic word {:02x?}",
                &dat[..MAGIC_WORD.len()]
            )));
        }
        Ok(FrameHeader {
            version: header::VERSION.u32(dat),
            total_packet_length: header::TOTAL_PACKET_LENGTH.u32(dat),
            platform: header::PLATFORM.u32(dat),
            frame_number: header::FRAME_NUMBER.u32(dat),
            cpu_cycles: header::CPU_CYCLES.u32(dat),
            num_detected_obj: header::NUM_DETECTED_OBJ.u32(dat),
            num_tlvs: header::NUM_TLVS.u32(dat),
            subframe_number: header::SUBFRAME_NUMBER.u32(dat),
        })
    }

    #[must_use]
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        header::MAGIC.put(&mut buf, &MAGIC_WORD);
        header::VERSION.put(&mut buf, &self.version.to_le_bytes());
        header::TOTAL_PACKET_LENGTH.put(&mut buf, &self.total_packet_length.to_le_bytes());
        header::PLATFORM.put(&mut buf, &self.platform.to_le_bytes());
        header::FRAME_NUMBER.put(&mut buf, &self.frame_number.to_le_bytes());
        header::CPU_CYCLES.put(&mut buf, &self.cpu_cycles.to_le_bytes());
        header::NUM_DETECTED_OBJ.put(&mut buf, &self.num_detected_obj.to_le_bytes());
        header::NUM_TLVS.put(&mut buf, &self.num_tlvs.to_le_bytes());
        header::SUBFRAME_NUMBER.put(&mut buf, &self.subframe_number.to_le_bytes());
        buf
    }
}

/// A synchronized frame exactly as read from the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub header: FrameHeader,
    /// All `total_packet_length` bytes of the frame, starting with the magic word.
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Construct from complete frame bytes, validating the header against `data`.
    ///
    /// # Errors
    /// [Error::MalformedHeader] if the header is invalid or its declared length does not
    /// match `data.len()`.
    pub fn new(data: Vec<u8>) -> Result<Self> {
        let header = match FrameHeader::decode(&data) {
            Ok(header) => header,
            Err(Error::NotEnoughData { actual, minimum }) => {
                return Err(Error::MalformedHeader(format!(
                    "frame of {actual} bytes is shorter than the {minimum} byte header"
                )))
            }
            Err(err) => return Err(err),
        };
        if header.total_packet_length as usize != data.len() {
            return Err(Error::MalformedHeader(format!(
                "declared length {} does not match frame length {}",
                header.total_packet_length,
                data.len()
            )));
        }
        Ok(RawFrame { header, data })
    }

    /// The TLV region following the header.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.data[FrameHeader::LEN..]
    }

    /// Iterate the TLV records of this frame.
    #[must_use]
    pub fn tlvs(&self) -> TlvWalker<'_> {
        TlvWalker::new(self.body(), self.header.num_tlvs)
    }
}

/// Compute the number of frames missing between frame numbers `cur` and `last`,
/// accounting for counter wrap.
#[must_use]
pub fn missing_frames(cur: u32, last: u32) -> u32 {
    cur.wrapping_sub(last).wrapping_sub(1)
}
