use super::{FrameHeader, RawFrame, TlvHeader, TlvType};
use crate::points::{
    compressed, extended, standard, ExtendedRecord, ExtendedUnits, Point, SphericalRecord,
    SphericalUnits,
};

/// Builds wire format frames.
///
/// `total_packet_length` and, unless overridden, `num_tlvs` and `num_detected_obj` are
/// computed from the TLVs added.
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    version: u32,
    platform: u32,
    frame_number: u32,
    cpu_cycles: u32,
    subframe_number: u32,
    num_detected_obj: Option<u32>,
    num_tlvs: Option<u32>,
    detected: u32,
    tlvs: Vec<(u32, Vec<u8>)>,
}

impl FrameBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: u32) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_frame_number(mut self, frame_number: u32) -> Self {
        self.frame_number = frame_number;
        self
    }

    #[must_use]
    pub fn with_cpu_cycles(mut self, cpu_cycles: u32) -> Self {
        self.cpu_cycles = cpu_cycles;
        self
    }

    #[must_use]
    pub fn with_subframe_number(mut self, subframe_number: u32) -> Self {
        self.subframe_number = subframe_number;
        self
    }

    /// Override the detected object count, which otherwise counts points added.
    #[must_use]
    pub fn with_num_detected_obj(mut self, num: u32) -> Self {
        self.num_detected_obj = Some(num);
        self
    }

    /// Override the TLV count, e.g., to produce inconsistent frames.
    #[must_use]
    pub fn with_num_tlvs(mut self, num: u32) -> Self {
        self.num_tlvs = Some(num);
        self
    }

    /// Append a TLV with an arbitrary payload.
    #[must_use]
    pub fn tlv(mut self, typ: impl Into<u32>, payload: Vec<u8>) -> Self {
        self.tlvs.push((typ.into(), payload));
        self
    }

    #[must_use]
    pub fn standard_points(mut self, points: &[Point]) -> Self {
        self.detected += points.len() as u32;
        self.tlv(TlvType::DetectedPoints, standard::encode(points))
    }

    #[must_use]
    pub fn extended_points(mut self, units: &ExtendedUnits, records: &[ExtendedRecord]) -> Self {
        self.detected += records.len() as u32;
        self.tlv(TlvType::ExtDetectedPoints, extended::encode(units, records))
    }

    #[must_use]
    pub fn compressed_points(mut self, units: &SphericalUnits, records: &[SphericalRecord]) -> Self {
        self.detected += records.len() as u32;
        self.tlv(TlvType::CompressedPoints, compressed::encode(units, records))
    }

    /// The header the built frame will carry.
    #[must_use]
    pub fn header(&self) -> FrameHeader {
        let body: usize = self
            .tlvs
            .iter()
            .map(|(_, payload)| TlvHeader::LEN + payload.len())
            .sum();
        FrameHeader {
            version: self.version,
            total_packet_length: (FrameHeader::LEN + body) as u32,
            platform: self.platform,
            frame_number: self.frame_number,
            cpu_cycles: self.cpu_cycles,
            num_detected_obj: self.num_detected_obj.unwrap_or(self.detected),
            num_tlvs: self.num_tlvs.unwrap_or(self.tlvs.len() as u32),
            subframe_number: self.subframe_number,
        }
    }

    /// Encode the complete frame, magic word first.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let header = self.header();
        let mut buf = Vec::with_capacity(header.total_packet_length as usize);
        buf.extend_from_slice(&header.encode());
        for (typ, payload) in &self.tlvs {
            let tlv = TlvHeader {
                typ: *typ,
                length: payload.len() as u32,
            };
            buf.extend_from_slice(&tlv.encode());
            buf.extend_from_slice(payload);
        }
        buf
    }

    /// Encode the frame as a [RawFrame].
    #[must_use]
    pub fn build_raw(&self) -> RawFrame {
        RawFrame {
            header: self.header(),
            data: self.build(),
        }
    }
}
