use std::{
    fs::File,
    io::{stdout, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use mmwave::framing::{read_frames, FrameDecoder, PointCloudFrame};
use tracing::{info, warn};

use crate::info::Format;

/// Write one decoded frame: a one-line summary for text, one JSON object per line for
/// json.
pub fn write_frame<W: Write>(out: &mut W, frame: &PointCloudFrame, format: &Format) -> Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer(&mut *out, frame).context("serializing frame")?;
            writeln!(out)?;
        }
        Format::Text => {
            let tracking = &frame.tracking;
            write!(
                out,
                "frame {:>8} subframe {} points {:>4} targets {:>2}",
                frame.frame_number,
                frame.subframe_number,
                frame.points.len(),
                tracking.targets.len()
            )?;
            if let Some(presence) = tracking.presence {
                write!(out, " presence {presence}")?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

pub fn replay(fpath: &Path, format: &Format) -> Result<()> {
    let file = File::open(fpath).with_context(|| format!("opening {fpath:?}"))?;
    let decoder = FrameDecoder::default();
    let mut out = BufWriter::new(stdout().lock());

    let mut count = 0;
    for zult in read_frames(file) {
        match zult {
            Ok(raw) => {
                write_frame(&mut out, &decoder.decode(&raw), format)?;
                count += 1;
            }
            Err(err) => warn!("skipping frame: {err}"),
        }
    }
    out.flush()?;
    info!("replayed {count} frames from {fpath:?}");
    Ok(())
}
