use std::path::Path;

use anyhow::{bail, Context, Result};
use mmwave::device::{self, send_config, Channel, ConfigScript};
use mmwave::settings::Settings;
use tracing::info;

/// Send a configuration file over the command channel only; the data channel is left
/// alone.
pub fn config(settings: &Settings, fpath: &Path) -> Result<()> {
    let script =
        ConfigScript::load(fpath).with_context(|| format!("loading config {fpath:?}"))?;
    if script.is_empty() {
        bail!("{fpath:?} contains no configuration commands");
    }

    let mut port = device::open(Channel::Command, &settings.command_port())
        .context("opening command channel")?;
    send_config(&mut port, &script, &settings.send_opts())
        .with_context(|| format!("sending {fpath:?}"))?;
    info!("sent {} lines from {fpath:?}", script.lines().len());
    Ok(())
}
