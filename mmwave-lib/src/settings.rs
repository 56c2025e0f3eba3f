//! Runtime settings persisted as JSON.
//!
//! ```json
//! {
//!   "cliPortName": "/dev/ttyUSB0",
//!   "dataPortName": "/dev/ttyUSB1",
//!   "cliBaudRate": 115200,
//!   "dataBaudRate": 921600,
//!   "archive": { "dir": "radar_data", "framesPerFile": 100 }
//! }
//! ```
//!
//! Missing fields take their defaults.
use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::archive::ArchiveOpts;
use crate::device::{
    PortSettings, SendOpts, DEFAULT_COMMAND_BAUD, DEFAULT_DATA_BAUD, DEFAULT_TIMEOUT,
};
use crate::framing::DEFAULT_MAX_PACKET_LENGTH;
use crate::pipeline::PipelineOpts;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub cli_port_name: String,
    pub data_port_name: String,
    pub cli_baud_rate: u32,
    pub data_baud_rate: u32,
    /// Read timeout for both channels.
    pub timeout_ms: u64,
    /// Delay before each configuration line.
    pub line_delay_ms: u64,
    pub max_packet_length: usize,
    /// Archive raw frames when set.
    pub archive: Option<ArchiveOpts>,
    /// Attach target indices to the points of the frame they describe.
    pub associate_targets: bool,
    /// Bound the output channel to this many frames. Unbounded when unset.
    pub output_capacity: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            cli_port_name: "/dev/ttyUSB0".to_string(),
            data_port_name: "/dev/ttyUSB1".to_string(),
            cli_baud_rate: DEFAULT_COMMAND_BAUD,
            data_baud_rate: DEFAULT_DATA_BAUD,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            line_delay_ms: 30,
            max_packet_length: DEFAULT_MAX_PACKET_LENGTH,
            archive: None,
            associate_targets: false,
            output_capacity: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    ///
    /// # Errors
    /// If the file cannot be read or is not valid settings JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let dat = fs::read(path)?;
        Ok(serde_json::from_slice(&dat)?)
    }

    /// Write settings to a JSON file, replacing it.
    ///
    /// # Errors
    /// If the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dat = serde_json::to_vec_pretty(self)?;
        fs::write(path, dat)?;
        Ok(())
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn command_port(&self) -> PortSettings {
        PortSettings::builder()
            .path(self.cli_port_name.clone())
            .baud_rate(self.cli_baud_rate)
            .timeout(self.timeout())
            .build()
    }

    #[must_use]
    pub fn data_port(&self) -> PortSettings {
        PortSettings::builder()
            .path(self.data_port_name.clone())
            .baud_rate(self.data_baud_rate)
            .timeout(self.timeout())
            .build()
    }

    #[must_use]
    pub fn send_opts(&self) -> SendOpts {
        SendOpts::builder()
            .line_delay(Duration::from_millis(self.line_delay_ms))
            .build()
    }

    #[must_use]
    pub fn pipeline_opts(&self) -> PipelineOpts {
        PipelineOpts::builder()
            .max_packet_length(self.max_packet_length)
            .archive(self.archive.clone())
            .associate_targets(self.associate_targets)
            .capacity(self.output_capacity)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"cliPortName": "COM8", "dataPortName": "COM9"}"#).unwrap();

        assert_eq!(settings.cli_port_name, "COM8");
        assert_eq!(settings.data_port_name, "COM9");
        assert_eq!(settings.cli_baud_rate, 115_200);
        assert_eq!(settings.data_baud_rate, 921_600);
        assert_eq!(settings.command_port().timeout, Duration::from_millis(600));
        assert!(settings.archive.is_none());
    }

    #[test]
    fn archive_section_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"archive": {}}"#).unwrap();
        assert_eq!(settings.archive, Some(ArchiveOpts::default()));

        let opts = settings.pipeline_opts();
        assert_eq!(opts.archive.unwrap().frames_per_file, 100);
        assert!(opts.capacity.is_none());
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("runtimesettings.json");
        let settings = Settings {
            data_baud_rate: 460_800,
            output_capacity: Some(8),
            ..Default::default()
        };

        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn invalid_json_is_settings_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{").unwrap();

        assert!(matches!(Settings::load(&path), Err(Error::Settings(_))));
    }
}
