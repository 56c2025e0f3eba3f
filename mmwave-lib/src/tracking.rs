//! Tracker output TLVs.
//!
//! When the sensor runs its people-tracking chain, frames also carry a target list,
//! per-point target indices, target heights and a presence flag alongside the point
//! cloud.
use serde::{Deserialize, Serialize};

use crate::framing::{PointCloudFrame, TlvType};
use crate::layout::{Field, Kind, Layout};
use crate::report::{Diagnostic, Reporter};

mod target {
    use super::{Field, Kind, Layout};

    pub const TID: Field = Field::new("tid", 0, Kind::U32);
    pub const POS_X: Field = Field::new("pos_x", 4, Kind::F32);
    pub const POS_Y: Field = Field::new("pos_y", 8, Kind::F32);
    pub const POS_Z: Field = Field::new("pos_z", 12, Kind::F32);
    pub const VEL_X: Field = Field::new("vel_x", 16, Kind::F32);
    pub const VEL_Y: Field = Field::new("vel_y", 20, Kind::F32);
    pub const VEL_Z: Field = Field::new("vel_z", 24, Kind::F32);
    pub const ACC_X: Field = Field::new("acc_x", 28, Kind::F32);
    pub const ACC_Y: Field = Field::new("acc_y", 32, Kind::F32);
    pub const ACC_Z: Field = Field::new("acc_z", 36, Kind::F32);
    pub const ERROR_COVARIANCE: Field = Field::new("error_covariance", 40, Kind::Bytes(64));
    pub const GAIN: Field = Field::new("gating_gain", 104, Kind::F32);
    pub const CONFIDENCE: Field = Field::new("confidence", 108, Kind::F32);

    pub const LAYOUT: Layout = Layout::new(
        "target",
        112,
        &[
            TID,
            POS_X,
            POS_Y,
            POS_Z,
            VEL_X,
            VEL_Y,
            VEL_Z,
            ACC_X,
            ACC_Y,
            ACC_Z,
            ERROR_COVARIANCE,
            GAIN,
            CONFIDENCE,
        ],
    );
    const _: () = LAYOUT.check();
}

mod height {
    use super::{Field, Kind, Layout};

    pub const TARGET_ID: Field = Field::new("target_id", 0, Kind::U8);
    pub const MAX_Z: Field = Field::new("max_z", 1, Kind::F32);
    pub const MIN_Z: Field = Field::new("min_z", 5, Kind::F32);

    pub const LAYOUT: Layout = Layout::new("target height", 9, &[TARGET_ID, MAX_Z, MIN_Z]);
    const _: () = LAYOUT.check();
}

const PRESENCE: Field = Field::new("present", 0, Kind::I32);
const PRESENCE_LAYOUT: Layout = Layout::new("presence", 4, &[PRESENCE]);
const _: () = PRESENCE_LAYOUT.check();

pub const TARGET: Layout = target::LAYOUT;
pub const TARGET_HEIGHT: Layout = height::LAYOUT;

/// Target index values at or above this mark points not associated with any target.
pub const TARGET_INDEX_NONE: u8 = 253;

/// A tracked target.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Target {
    pub tid: u32,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub acceleration: [f32; 3],
    /// Row-major 4x4 error covariance matrix.
    pub error_covariance: Vec<f32>,
    pub gating_gain: f32,
    pub confidence: f32,
}

impl Target {
    #[must_use]
    pub fn decode(dat: &[u8]) -> Self {
        use target::*;
        Target {
            tid: TID.u32(dat),
            position: [POS_X.f32(dat), POS_Y.f32(dat), POS_Z.f32(dat)],
            velocity: [VEL_X.f32(dat), VEL_Y.f32(dat), VEL_Z.f32(dat)],
            acceleration: [ACC_X.f32(dat), ACC_Y.f32(dat), ACC_Z.f32(dat)],
            error_covariance: ERROR_COVARIANCE.f32s(dat, 16),
            gating_gain: GAIN.f32(dat),
            confidence: CONFIDENCE.f32(dat),
        }
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        use target::*;
        let start = buf.len();
        buf.resize(start + TARGET.size, 0);
        let dat = &mut buf[start..];
        TID.put(dat, &self.tid.to_le_bytes());
        for (field, v) in [POS_X, POS_Y, POS_Z]
            .iter()
            .zip(self.position)
            .chain([VEL_X, VEL_Y, VEL_Z].iter().zip(self.velocity))
            .chain([ACC_X, ACC_Y, ACC_Z].iter().zip(self.acceleration))
        {
            field.put(dat, &v.to_le_bytes());
        }
        let ec: Vec<u8> = (0..16)
            .flat_map(|i| self.error_covariance.get(i).copied().unwrap_or(0.0).to_le_bytes())
            .collect();
        ERROR_COVARIANCE.put(dat, &ec);
        GAIN.put(dat, &self.gating_gain.to_le_bytes());
        CONFIDENCE.put(dat, &self.confidence.to_le_bytes());
    }
}

/// Vertical extent of a tracked target.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetHeight {
    pub target_id: u8,
    pub max_z: f32,
    pub min_z: f32,
}

impl TargetHeight {
    #[must_use]
    pub fn decode(dat: &[u8]) -> Self {
        TargetHeight {
            target_id: height::TARGET_ID.u8(dat),
            max_z: height::MAX_Z.f32(dat),
            min_z: height::MIN_Z.f32(dat),
        }
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        buf.resize(start + TARGET_HEIGHT.size, 0);
        let dat = &mut buf[start..];
        height::TARGET_ID.put(dat, &[self.target_id]);
        height::MAX_Z.put(dat, &self.max_z.to_le_bytes());
        height::MIN_Z.put(dat, &self.min_z.to_le_bytes());
    }
}

fn decode_all<T>(
    typ: TlvType,
    payload: &[u8],
    layout: &Layout,
    reporter: &dyn Reporter,
    decode: fn(&[u8]) -> T,
) -> Vec<T> {
    let (_, leftover) = layout.records_in(payload.len());
    if leftover != 0 {
        reporter.report(Diagnostic::PartialRecord {
            tlv_type: typ.into(),
            record_size: layout.size,
            leftover,
        });
    }
    payload.chunks_exact(layout.size).map(decode).collect()
}

/// Decode a type 1010 target list.
pub fn decode_targets(payload: &[u8], reporter: &dyn Reporter) -> Vec<Target> {
    decode_all(TlvType::TargetList, payload, &TARGET, reporter, Target::decode)
}

/// Decode a type 1012 target height list.
pub fn decode_heights(payload: &[u8], reporter: &dyn Reporter) -> Vec<TargetHeight> {
    decode_all(
        TlvType::TargetHeight,
        payload,
        &TARGET_HEIGHT,
        reporter,
        TargetHeight::decode,
    )
}

/// Decode a type 1011 target index list. Each byte is the target id of one point of the
/// *previous* frame.
#[must_use]
pub fn decode_indices(payload: &[u8]) -> Vec<u8> {
    payload.to_vec()
}

/// Decode a type 1021 presence indication, or `None` if the payload is too short.
pub fn decode_presence(payload: &[u8], reporter: &dyn Reporter) -> Option<bool> {
    if payload.len() < PRESENCE_LAYOUT.size {
        reporter.report(Diagnostic::PartialRecord {
            tlv_type: TlvType::PresenceIndication.into(),
            record_size: PRESENCE_LAYOUT.size,
            leftover: payload.len(),
        });
        return None;
    }
    Some(PRESENCE.i32(payload) > 0)
}

/// Attaches target indices to the frame they describe.
///
/// The indices for frame `n` arrive in frame `n + 1`, so each frame is held back until
/// its successor is pushed. Frames are still released in arrival order.
pub struct TargetAssociator<'a> {
    held: Option<PointCloudFrame>,
    reporter: &'a dyn Reporter,
}

impl<'a> TargetAssociator<'a> {
    pub fn new(reporter: &'a dyn Reporter) -> Self {
        TargetAssociator {
            held: None,
            reporter,
        }
    }

    /// Push the next decoded frame, returning the previous one with its target indices
    /// attached, if there was a previous frame.
    pub fn push(&mut self, mut frame: PointCloudFrame) -> Option<PointCloudFrame> {
        let indices = frame.tracking.target_indices.take();
        let mut prev = self.held.replace(frame)?;

        if let Some(indices) = indices {
            if indices.len() == prev.points.len() {
                prev.point_targets = Some(indices);
            } else {
                self.reporter.report(Diagnostic::TargetIndexMismatch {
                    frame_number: prev.frame_number,
                    points: prev.points.len(),
                    indices: indices.len(),
                });
            }
        }
        Some(prev)
    }

    /// Release the held frame without indices, e.g., at end of stream.
    pub fn finish(&mut self) -> Option<PointCloudFrame> {
        self.held.take()
    }
}
