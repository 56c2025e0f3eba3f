use serde::{Deserialize, Serialize};

use crate::layout::{Field, Kind, Layout};
use crate::{Error, Result};

const TYPE: Field = Field::new("type", 0, Kind::U32);
const LENGTH: Field = Field::new("length", 4, Kind::U32);
const LAYOUT: Layout = Layout::new("tlv header", 8, &[TYPE, LENGTH]);
const _: () = LAYOUT.check();

/// Known TLV record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TlvType {
    /// Uncompressed x, y, z, doppler floats.
    DetectedPoints,
    /// Per-point snr and noise for [TlvType::DetectedPoints]; not decoded.
    DetectedPointsSideInfo,
    /// Fixed-point cartesian points with a units header.
    ExtDetectedPoints,
    TargetList,
    TargetIndex,
    TargetHeight,
    /// Spherical points with a units header.
    CompressedPoints,
    PresenceIndication,
    Unknown(u32),
}

impl From<u32> for TlvType {
    fn from(value: u32) -> Self {
        match value {
            1 => TlvType::DetectedPoints,
            7 => TlvType::DetectedPointsSideInfo,
            301 => TlvType::ExtDetectedPoints,
            1010 => TlvType::TargetList,
            1011 => TlvType::TargetIndex,
            1012 => TlvType::TargetHeight,
            1020 => TlvType::CompressedPoints,
            1021 => TlvType::PresenceIndication,
            other => TlvType::Unknown(other),
        }
    }
}

impl From<TlvType> for u32 {
    fn from(value: TlvType) -> Self {
        match value {
            TlvType::DetectedPoints => 1,
            TlvType::DetectedPointsSideInfo => 7,
            TlvType::ExtDetectedPoints => 301,
            TlvType::TargetList => 1010,
            TlvType::TargetIndex => 1011,
            TlvType::TargetHeight => 1012,
            TlvType::CompressedPoints => 1020,
            TlvType::PresenceIndication => 1021,
            TlvType::Unknown(other) => other,
        }
    }
}

/// Header preceding each TLV record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvHeader {
    pub typ: u32,
    /// Payload length, excluding this header.
    pub length: u32,
}

impl TlvHeader {
    pub const LEN: usize = LAYOUT.size;

    /// Decode a header from the start of `dat`, or `None` if there are not enough bytes.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < Self::LEN {
            return None;
        }
        Some(TlvHeader {
            typ: TYPE.u32(dat),
            length: LENGTH.u32(dat),
        })
    }

    #[must_use]
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        TYPE.put(&mut buf, &self.typ.to_le_bytes());
        LENGTH.put(&mut buf, &self.length.to_le_bytes());
        buf
    }

    #[must_use]
    pub fn tlv_type(&self) -> TlvType {
        TlvType::from(self.typ)
    }
}

/// A TLV record borrowing its payload from the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tlv<'a> {
    pub header: TlvHeader,
    pub payload: &'a [u8],
}

/// Iterates the TLV records of a frame body.
///
/// Yields at most `num_tlvs` records and never reads past the end of the body. Iteration
/// stops early, without error, when fewer than [TlvHeader::LEN] bytes remain; check
/// [TlvWalker::ended_early] afterwards. A record declaring more payload than remains
/// yields [Error::MalformedTlv] and ends iteration.
#[derive(Debug, Clone)]
pub struct TlvWalker<'a> {
    dat: &'a [u8],
    offset: usize,
    declared: u32,
    walked: u32,
    done: bool,
    ended_early: bool,
}

impl<'a> TlvWalker<'a> {
    #[must_use]
    pub fn new(body: &'a [u8], num_tlvs: u32) -> Self {
        TlvWalker {
            dat: body,
            offset: 0,
            declared: num_tlvs,
            walked: 0,
            done: false,
            ended_early: false,
        }
    }

    /// Bytes of the body consumed so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.dat.len() - self.offset
    }

    /// Number of records yielded successfully.
    #[must_use]
    pub fn walked(&self) -> u32 {
        self.walked
    }

    /// True if the body ran out of room for a TLV header before all declared records
    /// were walked.
    #[must_use]
    pub fn ended_early(&self) -> bool {
        self.ended_early
    }
}

impl<'a> Iterator for TlvWalker<'a> {
    type Item = Result<Tlv<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.walked >= self.declared {
            return None;
        }
        let rest = &self.dat[self.offset..];
        let Some(header) = TlvHeader::decode(rest) else {
            self.done = true;
            self.ended_early = true;
            return None;
        };

        let declared = header.length as usize;
        let available = rest.len() - TlvHeader::LEN;
        if declared > available {
            self.done = true;
            return Some(Err(Error::MalformedTlv {
                tlv_type: header.typ,
                declared,
                remaining: available,
            }));
        }

        let start = TlvHeader::LEN;
        let payload = &rest[start..start + declared];
        self.offset += start + declared;
        self.walked += 1;

        Some(Ok(Tlv { header, payload }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn tlv(typ: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = TlvHeader {
            typ,
            length: payload.len() as u32,
        }
        .encode()
        .to_vec();
        buf.extend_from_slice(payload);
        buf
    }

    #[test_case(1, TlvType::DetectedPoints)]
    #[test_case(7, TlvType::DetectedPointsSideInfo)]
    #[test_case(301, TlvType::ExtDetectedPoints)]
    #[test_case(1010, TlvType::TargetList)]
    #[test_case(1011, TlvType::TargetIndex)]
    #[test_case(1012, TlvType::TargetHeight)]
    #[test_case(1020, TlvType::CompressedPoints)]
    #[test_case(1021, TlvType::PresenceIndication)]
    #[test_case(42, TlvType::Unknown(42))]
    fn tlv_type_from_u32(value: u32, expected: TlvType) {
        assert_eq!(TlvType::from(value), expected);
        assert_eq!(u32::from(expected), value);
    }

    #[test]
    fn walks_declared_records() {
        let mut body = tlv(1, &[1, 2, 3, 4]);
        body.extend(tlv(99, &[]));
        body.extend(tlv(1021, &[5; 4]));

        let mut walker = TlvWalker::new(&body, 3);
        let tlvs: Vec<Tlv> = walker.by_ref().map(Result::unwrap).collect();

        assert_eq!(tlvs.len(), 3);
        assert_eq!(tlvs[0].payload, &[1, 2, 3, 4]);
        assert_eq!(tlvs[1].header.tlv_type(), TlvType::Unknown(99));
        assert!(tlvs[1].payload.is_empty());
        assert_eq!(tlvs[2].header.tlv_type(), TlvType::PresenceIndication);
        assert_eq!(walker.consumed(), body.len());
        assert!(!walker.ended_early());
    }

    #[test]
    fn stops_at_declared_count() {
        let mut body = tlv(1, &[0; 16]);
        body.extend(tlv(1, &[0; 16]));

        let walker = TlvWalker::new(&body, 1);
        assert_eq!(walker.count(), 1);
    }

    #[test]
    fn overlong_payload_is_malformed() {
        let mut body = tlv(1, &[0; 16]);
        body.extend(tlv(1020, &[0; 10]));
        body.truncate(body.len() - 4);

        let mut walker = TlvWalker::new(&body, 2);
        assert!(walker.next().unwrap().is_ok());
        let zult = walker.next().unwrap();
        assert!(
            matches!(
                zult,
                Err(Error::MalformedTlv {
                    tlv_type: 1020,
                    declared: 10,
                    remaining: 6
                })
            ),
            "{zult:?}"
        );
        assert!(walker.next().is_none(), "walk must end after a malformed TLV");
    }

    #[test]
    fn short_header_ends_walk() {
        let mut body = tlv(1, &[0; 16]);
        body.extend_from_slice(&[1, 0, 0]);

        let mut walker = TlvWalker::new(&body, 2);
        assert!(walker.next().unwrap().is_ok());
        assert!(walker.next().is_none());
        assert!(walker.ended_early());
        assert_eq!(walker.walked(), 1);
        assert_eq!(walker.remaining(), 3);
    }
}
