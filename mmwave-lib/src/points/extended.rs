//! Fixed-point cartesian points, TLV type 301.
//!
//! The payload starts with an [ExtendedUnits] block followed by [ExtendedRecord]s. Raw
//! axis values are scaled by the shared xyz unit and doppler by the doppler unit.
use super::{decode_records, Point};
use crate::framing::TlvType;
use crate::layout::{Field, Kind, Layout};
use crate::report::{Diagnostic, Reporter};

mod units {
    use super::{Field, Kind, Layout};

    pub const XYZ: Field = Field::new("xyz_unit", 0, Kind::F32);
    pub const DOPPLER: Field = Field::new("doppler_unit", 4, Kind::F32);
    pub const SNR: Field = Field::new("snr_unit", 8, Kind::F32);
    pub const NOISE: Field = Field::new("noise_unit", 12, Kind::F32);
    pub const NUM_MAJOR: Field = Field::new("num_major_points", 16, Kind::I16);
    pub const NUM_MINOR: Field = Field::new("num_minor_points", 18, Kind::I16);

    pub const LAYOUT: Layout = Layout::new(
        "extended point units",
        20,
        &[XYZ, DOPPLER, SNR, NOISE, NUM_MAJOR, NUM_MINOR],
    );
    const _: () = LAYOUT.check();
}

mod record {
    use super::{Field, Kind, Layout};

    pub const X: Field = Field::new("x", 0, Kind::I16);
    pub const Y: Field = Field::new("y", 2, Kind::I16);
    pub const Z: Field = Field::new("z", 4, Kind::I16);
    pub const DOPPLER: Field = Field::new("doppler", 6, Kind::I16);
    pub const SNR: Field = Field::new("snr", 8, Kind::U8);
    pub const NOISE: Field = Field::new("noise", 9, Kind::U8);

    pub const LAYOUT: Layout =
        Layout::new("extended point", 10, &[X, Y, Z, DOPPLER, SNR, NOISE]);
    const _: () = LAYOUT.check();
}

pub const UNITS: Layout = units::LAYOUT;
pub const RECORD: Layout = record::LAYOUT;

/// Decompression units for one type 301 TLV.
///
/// Only the xyz and doppler units are applied. The remaining fields are decoded for
/// completeness.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExtendedUnits {
    pub xyz: f32,
    pub doppler: f32,
    pub snr: f32,
    pub noise: f32,
    pub num_major_points: i16,
    pub num_minor_points: i16,
}

impl ExtendedUnits {
    /// Decode from the start of `dat`, or `None` if it is too short.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < UNITS.size {
            return None;
        }
        Some(ExtendedUnits {
            xyz: units::XYZ.f32(dat),
            doppler: units::DOPPLER.f32(dat),
            snr: units::SNR.f32(dat),
            noise: units::NOISE.f32(dat),
            num_major_points: units::NUM_MAJOR.i16(dat),
            num_minor_points: units::NUM_MINOR.i16(dat),
        })
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; UNITS.size];
        units::XYZ.put(&mut buf, &self.xyz.to_le_bytes());
        units::DOPPLER.put(&mut buf, &self.doppler.to_le_bytes());
        units::SNR.put(&mut buf, &self.snr.to_le_bytes());
        units::NOISE.put(&mut buf, &self.noise.to_le_bytes());
        units::NUM_MAJOR.put(&mut buf, &self.num_major_points.to_le_bytes());
        units::NUM_MINOR.put(&mut buf, &self.num_minor_points.to_le_bytes());
        buf
    }
}

/// A raw type 301 point record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendedRecord {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub doppler: i16,
    pub snr: u8,
    pub noise: u8,
}

impl ExtendedRecord {
    /// Decode a single record. `dat` must be at least [RECORD] size bytes.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Self {
        ExtendedRecord {
            x: record::X.i16(dat),
            y: record::Y.i16(dat),
            z: record::Z.i16(dat),
            doppler: record::DOPPLER.i16(dat),
            snr: record::SNR.u8(dat),
            noise: record::NOISE.u8(dat),
        }
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        buf.resize(start + RECORD.size, 0);
        let dat = &mut buf[start..];
        record::X.put(dat, &self.x.to_le_bytes());
        record::Y.put(dat, &self.y.to_le_bytes());
        record::Z.put(dat, &self.z.to_le_bytes());
        record::DOPPLER.put(dat, &self.doppler.to_le_bytes());
        record::SNR.put(dat, &[self.snr]);
        record::NOISE.put(dat, &[self.noise]);
    }

    #[must_use]
    pub fn to_point(&self, units: &ExtendedUnits) -> Point {
        Point {
            x: f32::from(self.x) * units.xyz,
            y: f32::from(self.y) * units.xyz,
            z: f32::from(self.z) * units.xyz,
            velocity: f32::from(self.doppler) * units.doppler,
        }
    }
}

/// Decode a type 301 payload into `out`, returning the number of points added.
pub fn decode(payload: &[u8], out: &mut Vec<Point>, reporter: &dyn Reporter) -> usize {
    let tlv_type = TlvType::ExtDetectedPoints.into();
    let Some(units) = ExtendedUnits::decode(payload) else {
        reporter.report(Diagnostic::MissingUnits {
            tlv_type,
            length: payload.len(),
        });
        return 0;
    };
    decode_records(
        tlv_type,
        &payload[UNITS.size..],
        &RECORD,
        out,
        reporter,
        |r| ExtendedRecord::decode(r).to_point(&units),
    )
}

/// Encode units and records as a type 301 payload.
#[must_use]
pub fn encode(units: &ExtendedUnits, records: &[ExtendedRecord]) -> Vec<u8> {
    let mut buf = units.encode();
    buf.reserve(records.len() * RECORD.size);
    for r in records {
        r.encode_into(&mut buf);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CollectingReporter;

    fn units() -> ExtendedUnits {
        ExtendedUnits {
            xyz: 0.01,
            doppler: 0.5,
            snr: 0.1,
            noise: 0.2,
            num_major_points: 2,
            num_minor_points: 0,
        }
    }

    #[test]
    fn applies_shared_xyz_unit_and_doppler_unit() {
        let records = [
            ExtendedRecord {
                x: 100,
                y: -200,
                z: 50,
                doppler: -4,
                snr: 20,
                noise: 3,
            },
            ExtendedRecord {
                x: 0,
                y: 1000,
                z: 0,
                doppler: 2,
                snr: 0,
                noise: 0,
            },
        ];
        let payload = encode(&units(), &records);
        let reporter = CollectingReporter::new();
        let mut points = Vec::new();

        let added = decode(&payload, &mut points, &reporter);

        assert_eq!(added, 2);
        let p = points[0];
        assert!((p.x - 1.0).abs() < 1e-5, "{p:?}");
        assert!((p.y + 2.0).abs() < 1e-5, "{p:?}");
        assert!((p.z - 0.5).abs() < 1e-5, "{p:?}");
        assert!((p.velocity + 2.0).abs() < 1e-5, "{p:?}");
        assert!((points[1].y - 10.0).abs() < 1e-4);
        assert!((points[1].velocity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn units_layout_matches_wire_order() {
        let dat = units().encode();
        assert_eq!(dat.len(), 20);
        assert_eq!(dat[..4], 0.01f32.to_le_bytes());
        assert_eq!(dat[16..18], 2i16.to_le_bytes());
        assert_eq!(ExtendedUnits::decode(&dat), Some(units()));
    }

    #[test]
    fn short_units_block_yields_no_points() {
        let reporter = CollectingReporter::new();
        let mut points = Vec::new();

        let added = decode(&[0u8; 12], &mut points, &reporter);

        assert_eq!(added, 0);
        assert_eq!(
            reporter.diagnostics(),
            vec![Diagnostic::MissingUnits {
                tlv_type: 301,
                length: 12
            }]
        );
    }

    #[test]
    fn partial_trailing_record_is_dropped() {
        let mut payload = encode(&units(), &[ExtendedRecord::default(); 3]);
        payload.truncate(payload.len() - 1);
        let reporter = CollectingReporter::new();
        let mut points = Vec::new();

        assert_eq!(decode(&payload, &mut points, &reporter), 2);
    }
}
