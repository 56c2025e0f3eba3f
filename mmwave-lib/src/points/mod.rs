//! Point cloud TLV decoders.
//!
//! The sensor reports detected points in one of three encodings, each handled by its own
//! module: [standard] floats, [extended] fixed-point cartesian values, and [compressed]
//! fixed-point spherical values. All of them produce [Point]s appended to a caller
//! provided buffer.
pub mod compressed;
pub mod extended;
pub mod standard;

use serde::{Deserialize, Serialize};

use crate::layout::Layout;
use crate::report::{Diagnostic, Reporter};
use crate::{Error, Result};

pub use compressed::{SphericalRecord, SphericalUnits};
pub use extended::{ExtendedRecord, ExtendedUnits};

/// A detected point in the sensor frame: meters for position, m/s for radial velocity
/// with positive meaning approaching.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub velocity: f32,
}

impl Point {
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32, velocity: f32) -> Self {
        Point { x, y, z, velocity }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.velocity.is_finite()
    }

    /// Distance from the sensor.
    #[must_use]
    pub fn range(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

fn finite(point: Point) -> Result<Point> {
    if point.is_finite() {
        Ok(point)
    } else {
        Err(Error::Decode(format!("non-finite value in {point:?}")))
    }
}

/// Decode the fixed-size records in `dat` with `decode`, appending results to `out`.
///
/// Space for every whole record is reserved up front. A trailing partial record is
/// ignored and reported, as is any record `decode` rejects. Returns the number of points
/// appended.
pub(crate) fn decode_records<F>(
    tlv_type: u32,
    dat: &[u8],
    layout: &Layout,
    out: &mut Vec<Point>,
    reporter: &dyn Reporter,
    decode: F,
) -> usize
where
    F: Fn(&[u8]) -> Point,
{
    let (count, leftover) = layout.records_in(dat.len());
    if leftover != 0 {
        reporter.report(Diagnostic::PartialRecord {
            tlv_type,
            record_size: layout.size,
            leftover,
        });
    }

    out.reserve(count);
    let before = out.len();
    for (index, record) in dat.chunks_exact(layout.size).enumerate() {
        match finite(decode(record)) {
            Ok(point) => out.push(point),
            Err(err) => reporter.report(Diagnostic::PointSkipped {
                tlv_type,
                index,
                reason: err.to_string(),
            }),
        }
    }
    out.len() - before
}
