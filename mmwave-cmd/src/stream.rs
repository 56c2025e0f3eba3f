use std::{
    io::{stdout, Write},
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use mmwave::device::{ConfigScript, Radar};
use mmwave::pipeline;
use mmwave::report::TracingReporter;
use mmwave::settings::Settings;
use tracing::info;

use crate::info::Format;
use crate::replay::write_frame;

/// How long to keep streaming. Unlimited when both are unset.
pub struct Limits {
    pub frames: Option<usize>,
    pub seconds: Option<u64>,
}

const POLL: Duration = Duration::from_secs(1);

pub fn stream(
    settings: &Settings,
    config: Option<&Path>,
    limits: &Limits,
    format: &Format,
) -> Result<()> {
    let mut radar = Radar::connect(&settings.command_port(), &settings.data_port())
        .context("connecting to sensor")?;

    if let Some(path) = config {
        let script =
            ConfigScript::load(path).with_context(|| format!("loading config {path:?}"))?;
        radar
            .configure(&script, &settings.send_opts())
            .with_context(|| format!("sending config {path:?}"))?;
    }

    let (_command, data) = radar.split();
    let (worker, frames) = pipeline::spawn(
        data,
        settings.pipeline_opts(),
        Arc::new(TracingReporter),
    )
    .context("starting decode worker")?;

    let deadline = limits
        .seconds
        .map(|s| Instant::now() + Duration::from_secs(s));
    let mut out = stdout().lock();
    let mut count = 0;

    loop {
        if limits.frames.is_some_and(|max| count >= max) {
            break;
        }
        let wait = match deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    break;
                }
                left.min(POLL)
            }
            None => POLL,
        };
        match frames.recv_timeout(wait) {
            Ok(frame) => {
                write_frame(&mut out, &frame, format)?;
                out.flush()?;
                count += 1;
            }
            Err(err) if err.is_timeout() => {}
            Err(_) => break,
        }
    }

    // Joining flushes any partially filled archive file.
    worker.join().context("stopping decode worker")?;
    info!("streamed {count} frames");
    Ok(())
}
