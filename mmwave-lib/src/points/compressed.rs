//! Spherically compressed points, TLV type 1020.
//!
//! The payload starts with a [SphericalUnits] block followed by 8 byte
//! [SphericalRecord]s. Points are converted to cartesian with y forward and z up:
//!
//! ```text
//! x = r * sin(azimuth) * cos(elevation)
//! y = r * cos(azimuth) * cos(elevation)
//! z = r * sin(elevation)
//! ```
use super::{decode_records, Point};
use crate::framing::TlvType;
use crate::layout::{Field, Kind, Layout};
use crate::report::{Diagnostic, Reporter};

mod units {
    use super::{Field, Kind, Layout};

    pub const ELEVATION: Field = Field::new("elevation_unit", 0, Kind::F32);
    pub const AZIMUTH: Field = Field::new("azimuth_unit", 4, Kind::F32);
    pub const DOPPLER: Field = Field::new("doppler_unit", 8, Kind::F32);
    pub const RANGE: Field = Field::new("range_unit", 12, Kind::F32);
    pub const SNR: Field = Field::new("snr_unit", 16, Kind::F32);

    pub const LAYOUT: Layout = Layout::new(
        "compressed point units",
        20,
        &[ELEVATION, AZIMUTH, DOPPLER, RANGE, SNR],
    );
    const _: () = LAYOUT.check();
}

mod record {
    use super::{Field, Kind, Layout};

    pub const ELEVATION: Field = Field::new("elevation", 0, Kind::I8);
    pub const AZIMUTH: Field = Field::new("azimuth", 1, Kind::I8);
    pub const DOPPLER: Field = Field::new("doppler", 2, Kind::I16);
    pub const RANGE: Field = Field::new("range", 4, Kind::U16);
    pub const SNR: Field = Field::new("snr", 6, Kind::U16);

    pub const LAYOUT: Layout = Layout::new(
        "compressed point",
        8,
        &[ELEVATION, AZIMUTH, DOPPLER, RANGE, SNR],
    );
    const _: () = LAYOUT.check();
}

pub const UNITS: Layout = units::LAYOUT;
pub const RECORD: Layout = record::LAYOUT;

/// Decompression units for one type 1020 TLV. Angles are radians per count, range is
/// meters per count and doppler m/s per count.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SphericalUnits {
    pub elevation: f32,
    pub azimuth: f32,
    pub doppler: f32,
    pub range: f32,
    pub snr: f32,
}

impl SphericalUnits {
    /// Decode from the start of `dat`, or `None` if it is too short.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < UNITS.size {
            return None;
        }
        Some(SphericalUnits {
            elevation: units::ELEVATION.f32(dat),
            azimuth: units::AZIMUTH.f32(dat),
            doppler: units::DOPPLER.f32(dat),
            range: units::RANGE.f32(dat),
            snr: units::SNR.f32(dat),
        })
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; UNITS.size];
        units::ELEVATION.put(&mut buf, &self.elevation.to_le_bytes());
        units::AZIMUTH.put(&mut buf, &self.azimuth.to_le_bytes());
        units::DOPPLER.put(&mut buf, &self.doppler.to_le_bytes());
        units::RANGE.put(&mut buf, &self.range.to_le_bytes());
        units::SNR.put(&mut buf, &self.snr.to_le_bytes());
        buf
    }
}

/// A raw type 1020 point record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SphericalRecord {
    pub elevation: i8,
    pub azimuth: i8,
    pub doppler: i16,
    pub range: u16,
    pub snr: u16,
}

impl SphericalRecord {
    /// Decode a single record. `dat` must be at least [RECORD] size bytes.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Self {
        SphericalRecord {
            elevation: record::ELEVATION.i8(dat),
            azimuth: record::AZIMUTH.i8(dat),
            doppler: record::DOPPLER.i16(dat),
            range: record::RANGE.u16(dat),
            snr: record::SNR.u16(dat),
        }
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        buf.resize(start + RECORD.size, 0);
        let dat = &mut buf[start..];
        record::ELEVATION.put(dat, &self.elevation.to_le_bytes());
        record::AZIMUTH.put(dat, &self.azimuth.to_le_bytes());
        record::DOPPLER.put(dat, &self.doppler.to_le_bytes());
        record::RANGE.put(dat, &self.range.to_le_bytes());
        record::SNR.put(dat, &self.snr.to_le_bytes());
    }

    #[must_use]
    pub fn to_point(&self, units: &SphericalUnits) -> Point {
        let elevation = f32::from(self.elevation) * units.elevation;
        let azimuth = f32::from(self.azimuth) * units.azimuth;
        let range = f32::from(self.range) * units.range;
        let (sin_el, cos_el) = elevation.sin_cos();
        let (sin_az, cos_az) = azimuth.sin_cos();
        Point {
            x: range * sin_az * cos_el,
            y: range * cos_az * cos_el,
            z: range * sin_el,
            velocity: f32::from(self.doppler) * units.doppler,
        }
    }
}

/// Decode a type 1020 payload into `out`, returning the number of points added.
pub fn decode(payload: &[u8], out: &mut Vec<Point>, reporter: &dyn Reporter) -> usize {
    let tlv_type = TlvType::CompressedPoints.into();
    let Some(units) = SphericalUnits::decode(payload) else {
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
        |r| SphericalRecord::decode(r).to_point(&units),
    )
}

/// Encode units and records as a type 1020 payload.
#[must_use]
pub fn encode(units: &SphericalUnits, records: &[SphericalRecord]) -> Vec<u8> {
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
    use std::f32::consts::FRAC_PI_2;

    const UNIT: SphericalUnits = SphericalUnits {
        elevation: 1.0,
        azimuth: 1.0,
        doppler: 1.0,
        range: 1.0,
        snr: 1.0,
    };

    fn assert_close(got: Point, want: Point) {
        for (g, w) in [
            (got.x, want.x),
            (got.y, want.y),
            (got.z, want.z),
            (got.velocity, want.velocity),
        ] {
            assert!((g - w).abs() < 1e-4, "got {got:?}, want {want:?}");
        }
    }

    #[test]
    fn boresight_point_lies_on_y_axis() {
        let payload = encode(
            &UNIT,
            &[SphericalRecord {
                elevation: 0,
                azimuth: 0,
                doppler: 0,
                range: 100,
                snr: 0,
            }],
        );
        let reporter = CollectingReporter::new();
        let mut points = Vec::new();

        assert_eq!(decode(&payload, &mut points, &reporter), 1);
        assert_close(points[0], Point::new(0.0, 100.0, 0.0, 0.0));
    }

    #[test]
    fn negative_angles_are_sign_extended() {
        let units = SphericalUnits {
            azimuth: FRAC_PI_2 / 64.0,
            elevation: FRAC_PI_2 / 64.0,
            range: 0.1,
            doppler: 0.25,
            snr: 1.0,
        };
        let payload = encode(
            &units,
            &[
                SphericalRecord {
                    elevation: 0,
                    azimuth: -64,
                    doppler: -8,
                    range: 20,
                    snr: 7,
                },
                SphericalRecord {
                    elevation: 64,
                    azimuth: 0,
                    doppler: 4,
                    range: 30,
                    snr: 7,
                },
            ],
        );
        assert_eq!(payload[20 + 1], 0xc0, "azimuth -64 encodes as 0xc0");
        let reporter = CollectingReporter::new();
        let mut points = Vec::new();

        assert_eq!(decode(&payload, &mut points, &reporter), 2);
        // Hard left, level
        assert_close(points[0], Point::new(-2.0, 0.0, 0.0, -2.0));
        // Straight up
        assert_close(points[1], Point::new(0.0, 0.0, 3.0, 1.0));
    }

    #[test]
    fn halts_at_truncated_record_and_keeps_prior_points() {
        let rec = SphericalRecord {
            range: 10,
            ..Default::default()
        };
        let mut payload = encode(&UNIT, &[rec, rec, rec]);
        payload.truncate(payload.len() - 3);
        let reporter = CollectingReporter::new();
        let mut points = vec![Point::new(9.0, 9.0, 9.0, 9.0)];

        let added = decode(&payload, &mut points, &reporter);

        assert_eq!(added, 2);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], Point::new(9.0, 9.0, 9.0, 9.0));
        assert_eq!(
            reporter.count(|d| matches!(d, Diagnostic::PartialRecord { leftover: 5, .. })),
            1
        );
    }

    #[test]
    fn missing_units_block() {
        let reporter = CollectingReporter::new();
        let mut points = Vec::new();
        assert_eq!(decode(&[0; 19], &mut points, &reporter), 0);
        assert_eq!(
            reporter.count(|d| matches!(d, Diagnostic::MissingUnits { tlv_type: 1020, .. })),
            1
        );
    }
}
