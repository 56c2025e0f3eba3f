use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use mmwave::framing::{FrameBuilder, MAGIC_WORD};
use mmwave::points::{ExtendedRecord, ExtendedUnits, Point, SphericalRecord, SphericalUnits};
use mmwave::tracking::TARGET_INDEX_NONE;
use rand::Rng;
use tracing::info;

#[derive(Debug, Clone)]
pub enum Encoding {
    Standard,
    Extended,
    Compressed,
}

impl clap::ValueEnum for Encoding {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Standard, Self::Extended, Self::Compressed]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Standard => Some(clap::builder::PossibleValue::new("standard")),
            Self::Extended => Some(clap::builder::PossibleValue::new("extended")),
            Self::Compressed => Some(clap::builder::PossibleValue::new("compressed")),
        }
    }
}

const SPHERICAL_UNITS: SphericalUnits = SphericalUnits {
    elevation: 0.01,
    azimuth: 0.01,
    doppler: 0.05,
    range: 0.00025,
    snr: 0.04,
};

const EXTENDED_UNITS: ExtendedUnits = ExtendedUnits {
    xyz: 0.001,
    doppler: 0.01,
    snr: 0.04,
    noise: 0.04,
    num_major_points: 0,
    num_minor_points: 0,
};

/// A frame with up to `max_points` random points in front of the sensor, carrying the
/// target indices of the previous frame's `prev_points` points.
fn random_frame<R: Rng>(
    rng: &mut R,
    frame_number: u32,
    max_points: usize,
    encoding: &Encoding,
    prev_points: usize,
) -> (Vec<u8>, usize) {
    let count = rng.gen_range(0..=max_points);
    let builder = FrameBuilder::new().with_frame_number(frame_number);
    let builder = match encoding {
        Encoding::Standard => {
            let points: Vec<Point> = (0..count)
                .map(|_| {
                    Point::new(
                        rng.gen_range(-3.0..3.0),
                        rng.gen_range(0.5..8.0),
                        rng.gen_range(-1.0..2.0),
                        rng.gen_range(-2.0..2.0),
                    )
                })
                .collect();
            builder.standard_points(&points)
        }
        Encoding::Extended => {
            let records: Vec<ExtendedRecord> = (0..count)
                .map(|_| ExtendedRecord {
                    x: rng.gen_range(-3000..3000),
                    y: rng.gen_range(500..8000),
                    z: rng.gen_range(-1000..2000),
                    doppler: rng.gen_range(-200..200),
                    snr: rng.gen(),
                    noise: rng.gen(),
                })
                .collect();
            builder.extended_points(&EXTENDED_UNITS, &records)
        }
        Encoding::Compressed => {
            let records: Vec<SphericalRecord> = (0..count)
                .map(|_| SphericalRecord {
                    elevation: rng.gen_range(-30..30),
                    azimuth: rng.gen_range(-100..100),
                    doppler: rng.gen_range(-40..40),
                    range: rng.gen_range(2000..32000),
                    snr: rng.gen(),
                })
                .collect();
            builder.compressed_points(&SPHERICAL_UNITS, &records)
        }
    };
    let indices: Vec<u8> = (0..prev_points)
        .map(|_| {
            if rng.gen_bool(0.2) {
                TARGET_INDEX_NONE
            } else {
                rng.gen_range(0..4)
            }
        })
        .collect();
    (builder.tlv(1011u32, indices).build(), count)
}

fn garbage<R: Rng>(rng: &mut R, max: usize) -> Vec<u8> {
    let len = rng.gen_range(0..=max);
    (0..len)
        .map(|_| match rng.gen::<u8>() {
            b if b == MAGIC_WORD[0] => 0,
            b => b,
        })
        .collect()
}

pub fn simulate(
    fpath: &Path,
    frames: u32,
    max_points: usize,
    max_garbage: usize,
    encoding: &Encoding,
) -> Result<()> {
    let file = File::create(fpath).with_context(|| format!("failed to create {fpath:?}"))?;
    let mut out = BufWriter::new(file);
    let mut rng = rand::thread_rng();

    let mut prev_points = 0;
    for frame_number in 1..=frames {
        if max_garbage > 0 {
            out.write_all(&garbage(&mut rng, max_garbage))?;
        }
        let (dat, points) =
            random_frame(&mut rng, frame_number, max_points, encoding, prev_points);
        out.write_all(&dat)?;
        prev_points = points;
    }
    out.flush()?;
    info!("wrote {frames} frames to {fpath:?}");
    Ok(())
}
