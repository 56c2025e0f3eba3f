use anyhow::{Context, Result};
use mmwave::framing::{missing_frames, FrameDecoder, Synchronizer};
use mmwave::report::{CollectingReporter, Diagnostic};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{stdout, Write},
    path::Path,
    sync::Arc,
};
use tracing::debug;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Default, Debug, Clone, Serialize)]
struct Summary {
    total_frames: usize,
    total_points: usize,
    missing_frames: usize,
    first_frame: Option<u32>,
    last_frame: Option<u32>,
    discarded_bytes: usize,
    frame_errors: usize,
    decode_warnings: usize,
}

#[derive(Debug, Clone, Serialize)]
struct Info {
    filename: String,
    summary: Summary,
    /// TLV counts by type number.
    tlvs: BTreeMap<u32, usize>,
}

/// Frames missing between `last` and `cur`. A counter that steps backwards by less than
/// half its range means the device restarted, which is not a gap; a larger backwards
/// step is the counter wrapping past `u32::MAX`.
fn gap(cur: u32, last: u32) -> usize {
    if cur < last && last - cur < u32::MAX / 2 {
        return 0;
    }
    missing_frames(cur, last) as usize
}

fn summarize(fpath: &Path) -> Result<Info> {
    let reader = File::open(fpath).context("opening input")?;
    let reporter = CollectingReporter::new();
    let decoder = FrameDecoder::new(Arc::new(reporter.clone()));

    let mut summary = Summary::default();
    let mut tlvs: BTreeMap<u32, usize> = BTreeMap::default();
    let mut frames = Synchronizer::new(reader).into_iter();

    for zult in frames.by_ref() {
        let raw = match zult {
            Ok(raw) => raw,
            Err(err) => {
                debug!("frame error: {err}");
                summary.frame_errors += 1;
                continue;
            }
        };
        let cur = raw.header.frame_number;
        if let Some(last) = summary.last_frame.filter(|last| *last != cur) {
            summary.missing_frames += gap(cur, last);
        }
        summary.first_frame.get_or_insert(cur);
        summary.last_frame = Some(cur);
        summary.total_frames += 1;

        for tlv in raw.tlvs().filter_map(Result::ok) {
            *tlvs.entry(tlv.header.typ).or_default() += 1;
        }
        summary.total_points += decoder.decode(&raw).points.len();
    }

    summary.discarded_bytes = frames.synchronizer().discarded;
    summary.decode_warnings =
        reporter.count(|d| !matches!(d, Diagnostic::UnknownTlv { .. }));

    Ok(Info {
        filename: fpath.to_string_lossy().to_string(),
        summary,
        tlvs,
    })
}

pub fn info(fpath: &Path, format: &Format) -> Result<()> {
    let info = summarize(fpath)?;

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &info).context("serializing to json")
        }
        Format::Text => {
            let data = render_text(&info).context("serializing info")?;
            stdout()
                .write_all(str::as_bytes(&data))
                .context("writing to stdout")
        }
    }
}

fn render_text(info: &Info) -> Result<String> {
    let mut hb = handlebars::Handlebars::new();
    hb.register_template_string("info", TEXT_TEMPLATE)
        .context("registering template")?;

    hb.render("info", &info).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ filename }}
===============================================================================
Frames:     {{ summary.total_frames }} ({{ summary.first_frame }} to {{ summary.last_frame }})
Missing:    {{ summary.missing_frames }}
Points:     {{ summary.total_points }}
Discarded:  {{ summary.discarded_bytes }} bytes
Errors:     {{ summary.frame_errors }} frames, {{ summary.decode_warnings }} decode warnings
TLVs:
{{ #each tlvs }}  {{ @key }}: {{ this }}
{{ /each }}";

#[cfg(test)]
mod tests {
    use super::*;
    use mmwave::framing::FrameBuilder;
    use mmwave::points::Point;
    use test_case::test_case;

    #[test_case(2, 1, 0; "consecutive")]
    #[test_case(5, 2, 2; "forward gap")]
    #[test_case(3, 11, 0; "restart")]
    #[test_case(1, u32::MAX, 1; "counter wraps")]
    fn gap_between_frames(cur: u32, last: u32, expected: usize) {
        assert_eq!(gap(cur, last), expected);
    }

    #[test]
    fn summarize_treats_restart_as_no_gap() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("frames.bin");
        let mut dat = Vec::new();
        for n in [10, 11, 3, 4] {
            dat.extend(FrameBuilder::new().with_frame_number(n).build());
        }
        std::fs::write(&path, dat).unwrap();

        let info = summarize(&path).unwrap();

        assert_eq!(info.summary.total_frames, 4);
        assert_eq!(info.summary.missing_frames, 0);
        assert_eq!(info.summary.first_frame, Some(10));
        assert_eq!(info.summary.last_frame, Some(4));
    }

    #[test]
    fn summarize_counts_gaps_and_tlvs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("frames.bin");
        let mut dat = vec![0xaa; 5];
        for n in [1, 2, 5] {
            dat.extend(
                FrameBuilder::new()
                    .with_frame_number(n)
                    .standard_points(&[Point::default(); 2])
                    .tlv(1021u32, 1i32.to_le_bytes().to_vec())
                    .build(),
            );
        }
        std::fs::write(&path, dat).unwrap();

        let info = summarize(&path).unwrap();

        assert_eq!(info.summary.total_frames, 3);
        assert_eq!(info.summary.total_points, 6);
        assert_eq!(info.summary.missing_frames, 2);
        assert_eq!(info.summary.first_frame, Some(1));
        assert_eq!(info.summary.last_frame, Some(5));
        assert_eq!(info.summary.discarded_bytes, 5);
        assert_eq!(info.tlvs.get(&1), Some(&3));
        assert_eq!(info.tlvs.get(&1021), Some(&3));

        let text = render_text(&info).unwrap();
        assert!(text.contains("Missing:    2"), "{text}");
    }
}
