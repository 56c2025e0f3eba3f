//! Uncompressed points, TLV type 1.
//!
//! Each record is four little-endian f32 values: x, y, z and doppler.
use super::{decode_records, Point};
use crate::framing::TlvType;
use crate::layout::{Field, Kind, Layout};
use crate::report::Reporter;

const X: Field = Field::new("x", 0, Kind::F32);
const Y: Field = Field::new("y", 4, Kind::F32);
const Z: Field = Field::new("z", 8, Kind::F32);
const DOPPLER: Field = Field::new("doppler", 12, Kind::F32);

pub const RECORD: Layout = Layout::new("detected point", 16, &[X, Y, Z, DOPPLER]);
const _: () = RECORD.check();

/// Decode a type 1 payload into `out`, returning the number of points added.
pub fn decode(payload: &[u8], out: &mut Vec<Point>, reporter: &dyn Reporter) -> usize {
    decode_records(
        TlvType::DetectedPoints.into(),
        payload,
        &RECORD,
        out,
        reporter,
        |r| Point::new(X.f32(r), Y.f32(r), Z.f32(r), DOPPLER.f32(r)),
    )
}

/// Encode points as a type 1 payload.
#[must_use]
pub fn encode(points: &[Point]) -> Vec<u8> {
    let mut buf = vec![0u8; points.len() * RECORD.size];
    for (point, record) in points.iter().zip(buf.chunks_exact_mut(RECORD.size)) {
        X.put(record, &point.x.to_le_bytes());
        Y.put(record, &point.y.to_le_bytes());
        Z.put(record, &point.z.to_le_bytes());
        DOPPLER.put(record, &point.velocity.to_le_bytes());
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{CollectingReporter, Diagnostic};

    #[test]
    fn decodes_literal_values_in_order() {
        let mut payload = Vec::new();
        for v in [1.0f32, 2.0, 3.0, 0.5, -1.0, 0.0, 4.0, -0.25] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        let reporter = CollectingReporter::new();
        let mut points = Vec::new();

        let added = decode(&payload, &mut points, &reporter);

        assert_eq!(added, 2);
        assert_eq!(
            points,
            vec![
                Point::new(1.0, 2.0, 3.0, 0.5),
                Point::new(-1.0, 0.0, 4.0, -0.25)
            ]
        );
        assert!(reporter.diagnostics().is_empty());
    }

    #[test]
    fn truncates_to_last_complete_record() {
        let mut payload = encode(&[Point::new(1.0, 1.0, 1.0, 1.0), Point::new(2.0, 2.0, 2.0, 2.0)]);
        payload.truncate(payload.len() - 5);
        let reporter = CollectingReporter::new();
        let mut points = Vec::new();

        let added = decode(&payload, &mut points, &reporter);

        assert_eq!(added, 1);
        assert_eq!(points[0], Point::new(1.0, 1.0, 1.0, 1.0));
        assert_eq!(
            reporter.count(|d| matches!(d, Diagnostic::PartialRecord { leftover: 11, .. })),
            1
        );
    }

    #[test]
    fn empty_payload_has_no_points() {
        let reporter = CollectingReporter::new();
        let mut points = Vec::new();
        assert_eq!(decode(&[], &mut points, &reporter), 0);
        assert!(points.is_empty());
    }
}
