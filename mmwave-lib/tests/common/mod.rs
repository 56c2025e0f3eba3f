#![allow(dead_code)]

use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use mmwave::framing::{FrameBuilder, MAGIC_WORD};
use mmwave::points::{Point, SphericalRecord, SphericalUnits};
use rand::Rng;

pub fn fixture_path(name: &str) -> PathBuf {
    let mut path =
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    path.push("tests/fixtures");
    path.push(name);
    path
}

/// Random bytes that cannot contain the magic word.
pub fn garbage(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| match rng.gen::<u8>() {
            b if b == MAGIC_WORD[0] => 0xff,
            b => b,
        })
        .collect()
}

/// A frame carrying `points` standard points.
pub fn standard_frame(frame_number: u32, points: usize) -> Vec<u8> {
    let points: Vec<Point> = (0..points)
        .map(|i| Point::new(i as f32, 1.0, 0.5, -0.25))
        .collect();
    FrameBuilder::new()
        .with_frame_number(frame_number)
        .standard_points(&points)
        .build()
}

/// A frame carrying `points` compressed points at 1 cm range resolution.
pub fn compressed_frame(frame_number: u32, points: usize) -> Vec<u8> {
    let units = SphericalUnits {
        elevation: 0.01,
        azimuth: 0.01,
        doppler: 0.1,
        range: 0.01,
        snr: 0.04,
    };
    let records: Vec<SphericalRecord> = (0..points)
        .map(|i| SphericalRecord {
            elevation: 0,
            azimuth: (i % 100) as i8 - 50,
            doppler: -5,
            range: 250,
            snr: 100,
        })
        .collect();
    FrameBuilder::new()
        .with_frame_number(frame_number)
        .compressed_points(&units, &records)
        .build()
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_for<F>(timeout: Duration, cond: F) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}
