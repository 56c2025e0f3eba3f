use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{span, Level};

use super::{FrameHeader, RawFrame, Tlv, TlvType};
use crate::points::{self, Point};
use crate::report::{Diagnostic, Reporter, TracingReporter};
use crate::tracking::{self, Target, TargetHeight};
use crate::Error;

/// Tracker output carried by a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tracking {
    pub targets: Vec<Target>,
    pub heights: Vec<TargetHeight>,
    /// Target ids for the points of the *previous* frame, as received.
    pub target_indices: Option<Vec<u8>>,
    pub presence: Option<bool>,
}

/// The decoded contents of one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloudFrame {
    pub frame_number: u32,
    pub subframe_number: u32,
    /// Points in the order they were decoded.
    pub points: Vec<Point>,
    pub tracking: Tracking,
    /// Target id of each point, present only when target association is enabled and the
    /// following frame supplied matching indices.
    pub point_targets: Option<Vec<u8>>,
    pub header: FrameHeader,
}

/// Decodes the TLV records of [RawFrame]s.
///
/// Decoding never fails as a whole; problems with individual TLVs or points are sent
/// to the configured [Reporter] and the frame contains whatever decoded cleanly.
#[derive(Clone)]
pub struct FrameDecoder {
    reporter: Arc<dyn Reporter>,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(Arc::new(TracingReporter))
    }
}

impl FrameDecoder {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        FrameDecoder { reporter }
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    #[must_use]
    pub fn decode(&self, frame: &RawFrame) -> PointCloudFrame {
        let header = frame.header;
        let span = span!(Level::TRACE, "frame", number = header.frame_number);
        let _guard = span.enter();

        let body = frame.body();
        // Advisory only; bounded by what the body could possibly hold.
        let estimate = (header.num_detected_obj as usize).min(body.len() / 8);
        let mut out = PointCloudFrame {
            frame_number: header.frame_number,
            subframe_number: header.subframe_number,
            points: Vec::with_capacity(estimate),
            header,
            ..Default::default()
        };

        let mut walker = frame.tlvs();
        for tlv in walker.by_ref() {
            match tlv {
                Ok(tlv) => self.dispatch(&tlv, &mut out),
                Err(Error::MalformedTlv {
                    tlv_type,
                    declared,
                    remaining,
                }) => self.reporter.report(Diagnostic::MalformedTlv {
                    frame_number: header.frame_number,
                    tlv_type,
                    declared,
                    remaining,
                }),
                Err(err) => self.reporter.report(Diagnostic::from(&err)),
            }
        }
        if walker.ended_early() {
            self.reporter.report(Diagnostic::TlvWalkEnded {
                frame_number: header.frame_number,
                walked: walker.walked(),
                declared: header.num_tlvs,
                remaining: walker.remaining(),
            });
        }

        out
    }

    fn dispatch(&self, tlv: &Tlv, out: &mut PointCloudFrame) {
        let reporter = self.reporter.as_ref();
        match tlv.header.tlv_type() {
            TlvType::DetectedPoints => {
                points::standard::decode(tlv.payload, &mut out.points, reporter);
            }
            TlvType::ExtDetectedPoints => {
                points::extended::decode(tlv.payload, &mut out.points, reporter);
            }
            TlvType::CompressedPoints => {
                points::compressed::decode(tlv.payload, &mut out.points, reporter);
            }
            TlvType::TargetList => {
                out.tracking.targets = tracking::decode_targets(tlv.payload, reporter);
            }
            TlvType::TargetIndex => {
                out.tracking.target_indices = Some(tracking::decode_indices(tlv.payload));
            }
            TlvType::TargetHeight => {
                out.tracking.heights = tracking::decode_heights(tlv.payload, reporter);
            }
            TlvType::PresenceIndication => {
                out.tracking.presence = tracking::decode_presence(tlv.payload, reporter);
            }
            TlvType::DetectedPointsSideInfo | TlvType::Unknown(_) => {
                reporter.report(Diagnostic::UnknownTlv {
                    frame_number: out.frame_number,
                    tlv_type: tlv.header.typ,
                    length: tlv.payload.len(),
                });
            }
        }
    }
}
