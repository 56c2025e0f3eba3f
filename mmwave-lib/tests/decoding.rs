mod common;

use std::{fs::File, io::Cursor};

use mmwave::framing::{
    read_frames, FrameBuilder, FrameDecoder, FrameHeader, Synchronizer, TlvType, MAGIC_WORD,
};
use mmwave::points::Point;
use mmwave::report::{CollectingReporter, Diagnostic};
use mmwave::Error;
use std::sync::Arc;

use common::{compressed_frame, fixture_path, garbage, standard_frame};

fn decoder() -> (FrameDecoder, CollectingReporter) {
    let reporter = CollectingReporter::new();
    (FrameDecoder::new(Arc::new(reporter.clone())), reporter)
}

#[test]
fn frames_are_found_among_garbage() {
    let mut dat = garbage(1000);
    dat.extend(standard_frame(1, 3));
    dat.extend(garbage(57));
    dat.extend(compressed_frame(2, 10));
    dat.extend(garbage(13));

    let mut sync = Synchronizer::new(Cursor::new(dat));
    let first = sync.next_frame().unwrap();
    let second = sync.next_frame().unwrap();
    assert!(matches!(sync.next_frame(), Err(Error::SyncTimeout)));

    assert_eq!(first.header.frame_number, 1);
    assert_eq!(second.header.frame_number, 2);
    assert_eq!(sync.synced, 2);
    assert_eq!(sync.discarded, 1000 + 57 + 13);
}

#[test]
fn partial_magic_word_overlapping_real_one() {
    let mut dat = vec![0x02, 0x01, 0x04];
    dat.extend(standard_frame(5, 1));

    let frames: Vec<_> = read_frames(Cursor::new(dat)).collect();

    assert_eq!(frames.len(), 1);
    let frame = frames[0].as_ref().unwrap();
    assert_eq!(frame.header.frame_number, 5);
}

#[test]
fn header_total_length_matches_walked_tlvs() {
    let frame = FrameBuilder::new()
        .with_frame_number(99)
        .standard_points(&[Point::new(1.0, 2.0, 3.0, 4.0)])
        .tlv(TlvType::Unknown(42), vec![0; 13])
        .build_raw();

    let header = FrameHeader::decode(&frame.data).unwrap();
    assert_eq!(header, frame.header);
    assert_eq!(header.encode().as_slice(), &frame.data[..FrameHeader::LEN]);

    let mut walker = frame.tlvs();
    let tlvs: Vec<_> = walker.by_ref().map(Result::unwrap).collect();
    assert_eq!(tlvs.len(), 2);
    assert!(!walker.ended_early());
    assert_eq!(
        FrameHeader::LEN + walker.consumed(),
        header.total_packet_length as usize
    );
}

#[test]
fn decode_standard_point_literal() {
    let dat = hex::decode(concat!(
        "0201040306050807", // magic
        "00000000",         // version
        "40000000",         // total packet length
        "00000000",         // platform
        "07000000",         // frame number
        "00000000",         // cpu cycles
        "01000000",         // detected objects
        "01000000",         // tlvs
        "00000000",         // subframe
        "01000000",         // tlv type
        "10000000",         // tlv length
        "0000803f",         // x
        "00000040",         // y
        "0000003f",         // z
        "000080be",         // velocity
    ))
    .unwrap();
    let (decoder, reporter) = decoder();

    let raw = read_frames(Cursor::new(dat)).next().unwrap().unwrap();
    let frame = decoder.decode(&raw);

    assert_eq!(frame.frame_number, 7);
    assert_eq!(frame.points, vec![Point::new(1.0, 2.0, 0.5, -0.25)]);
    assert!(reporter.diagnostics().is_empty());
}

#[test]
fn decode_compressed_points() {
    let (decoder, reporter) = decoder();
    let raw = read_frames(Cursor::new(compressed_frame(3, 64)))
        .next()
        .unwrap()
        .unwrap();

    let frame = decoder.decode(&raw);

    assert_eq!(frame.points.len(), 64);
    for point in &frame.points {
        assert!((point.range() - 2.5).abs() < 1e-3, "{point:?}");
        assert!((point.velocity + 0.5).abs() < 1e-6, "{point:?}");
        assert!(point.z.abs() < 1e-6, "{point:?}");
    }
    assert!(reporter.diagnostics().is_empty());
}

#[test]
fn malformed_header_then_next_frame() {
    let mut dat = MAGIC_WORD.to_vec();
    dat.extend([0, 0, 0, 0]);
    dat.extend(8u32.to_le_bytes());
    dat.extend(standard_frame(11, 2));

    let frames: Vec<_> = read_frames(Cursor::new(dat)).collect();

    assert_eq!(frames.len(), 2);
    assert!(matches!(frames[0], Err(Error::MalformedHeader(_))));
    assert_eq!(frames[1].as_ref().unwrap().header.frame_number, 11);
}

#[test]
fn truncated_final_frame() {
    let mut dat = standard_frame(1, 1);
    let mut cut = standard_frame(2, 4);
    let full = cut.len();
    cut.truncate(full - 10);
    dat.extend(cut);

    let frames: Vec<_> = read_frames(Cursor::new(dat)).collect();

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].as_ref().unwrap().header.frame_number, 1);
    match &frames[1] {
        Err(Error::TruncatedFrame { expected, actual }) => {
            assert_eq!(*expected, full);
            assert_eq!(*actual, full - 10);
        }
        other => panic!("expected truncated frame, got {other:?}"),
    }
}

#[test]
fn unknown_tlv_is_skipped() {
    let (decoder, reporter) = decoder();
    let raw = FrameBuilder::new()
        .with_frame_number(4)
        .tlv(TlvType::Unknown(9999), vec![0xaa; 24])
        .standard_points(&[Point::new(0.0, 1.0, 0.0, 0.0)])
        .build_raw();

    let frame = decoder.decode(&raw);

    assert_eq!(frame.points, vec![Point::new(0.0, 1.0, 0.0, 0.0)]);
    assert_eq!(
        reporter.diagnostics(),
        vec![Diagnostic::UnknownTlv {
            frame_number: 4,
            tlv_type: 9999,
            length: 24,
        }]
    );
}

#[test]
fn overlong_tlv_keeps_earlier_points() {
    let (decoder, reporter) = decoder();
    let mut raw = FrameBuilder::new()
        .standard_points(&[Point::new(1.0, 1.0, 1.0, 1.0)])
        .tlv(TlvType::DetectedPoints, vec![0; 16])
        .build();
    // Second TLV's length field claims more than remains.
    let second_len = raw.len() - 16 - 4;
    raw[second_len..second_len + 4].copy_from_slice(&1000u32.to_le_bytes());

    raw.extend(standard_frame(2, 2));

    let frames: Vec<_> = read_frames(Cursor::new(raw))
        .map(|raw| decoder.decode(&raw.unwrap()))
        .collect();

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].points.len(), 1);
    assert_eq!(frames[1].frame_number, 2);
    assert_eq!(frames[1].points.len(), 2);
    assert_eq!(
        reporter.count(|d| matches!(d, Diagnostic::MalformedTlv { declared: 1000, .. })),
        1
    );
}

#[test]
fn archive_fixture_decodes() {
    let file = File::open(fixture_path("two_frames.bin")).unwrap();
    let (decoder, reporter) = decoder();

    let frames: Vec<_> = read_frames(file)
        .map(|raw| decoder.decode(&raw.unwrap()))
        .collect();

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].frame_number, 1);
    assert_eq!(frames[0].points.len(), 3);
    assert_eq!(frames[1].frame_number, 2);
    assert_eq!(frames[1].points.len(), 10);
    assert!(reporter.diagnostics().is_empty());
}
