//! Serial connection to the sensor.
//!
//! The sensor exposes two UARTs: a command channel accepting text configuration and a
//! data channel streaming frames. Both are opened 8N1 without flow control and with a
//! bounded read timeout so readers regain control periodically.
mod command;
pub mod mock;

use std::{fmt, time::Duration};

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;
use typed_builder::TypedBuilder;

use crate::{Error, Result};

pub use command::{send_config, CommandPort, ConfigScript, SendOpts};

/// Default command channel baud rate.
pub const DEFAULT_COMMAND_BAUD: u32 = 115_200;
/// Default data channel baud rate.
pub const DEFAULT_DATA_BAUD: u32 = 921_600;
/// Default read timeout for both channels.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(600);

/// Identifies one of the sensor's serial channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Command,
    Data,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Command => write!(f, "command"),
            Channel::Data => write!(f, "data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct PortSettings {
    #[builder(setter(into))]
    pub path: String,
    pub baud_rate: u32,
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,
}

/// Open a serial port for `channel`.
///
/// # Errors
/// [Error::Connection] if the port cannot be opened.
pub fn open(channel: Channel, settings: &PortSettings) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(&settings.path, settings.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(settings.timeout)
        .open()
        .map_err(|source| Error::Connection {
            channel,
            port: settings.path.clone(),
            source,
        })?;
    info!(
        "opened {channel} channel {} at {} baud",
        settings.path, settings.baud_rate
    );
    Ok(port)
}

/// Both channels of a connected sensor.
pub struct Radar {
    pub command: Box<dyn SerialPort>,
    pub data: Box<dyn SerialPort>,
}

impl Radar {
    /// Open the command and data channels.
    ///
    /// # Errors
    /// [Error::Connection] if either channel cannot be opened. Nothing is retried.
    pub fn connect(command: &PortSettings, data: &PortSettings) -> Result<Self> {
        let command = open(Channel::Command, command)?;
        let data = open(Channel::Data, data)?;
        data.clear(ClearBuffer::Output)?;
        Ok(Radar { command, data })
    }

    /// Send a configuration over the command channel.
    ///
    /// # Errors
    /// [Error::ConfigSend] if any line fails.
    pub fn configure(&mut self, script: &ConfigScript, opts: &SendOpts) -> Result<()> {
        send_config(&mut self.command, script, opts)
    }

    /// Separate the channels, e.g., to hand the data channel to a decode worker.
    pub fn split(self) -> (Box<dyn SerialPort>, Box<dyn SerialPort>) {
        (self.command, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_settings_default_timeout() {
        let settings = PortSettings::builder()
            .path("/dev/ttyUSB0")
            .baud_rate(DEFAULT_DATA_BAUD)
            .build();
        assert_eq!(settings.timeout, Duration::from_millis(600));
    }

    #[test]
    fn open_missing_port_is_connection_error() {
        let settings = PortSettings::builder()
            .path("/dev/this-port-does-not-exist")
            .baud_rate(DEFAULT_COMMAND_BAUD)
            .build();
        let zult = open(Channel::Command, &settings);
        match zult {
            Err(Error::Connection { channel, port, .. }) => {
                assert_eq!(channel, Channel::Command);
                assert_eq!(port, "/dev/this-port-does-not-exist");
            }
            Err(err) => panic!("expected connection error, got {err:?}"),
            Ok(_) => panic!("expected connection error, got a port"),
        }
    }
}
