use std::{
    fs,
    io::{ErrorKind, Read, Write},
    path::Path,
    thread,
    time::Duration,
};

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use crate::{Error, Result};

/// Longest acknowledgement line kept; the rest of an overlong line is discarded.
const MAX_ACK_LEN: usize = 1024;

/// The command channel as used by [send_config].
pub trait CommandPort: Read + Write {
    /// Change the channel's baud rate.
    ///
    /// # Errors
    /// If the underlying port rejects the rate.
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()>;

    /// Discard any unread input.
    ///
    /// # Errors
    /// If the underlying port fails to clear its buffer.
    fn clear_input(&mut self) -> Result<()>;
}

impl CommandPort for Box<dyn SerialPort> {
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        SerialPort::set_baud_rate(self.as_mut(), baud_rate)?;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        self.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

/// A sensor configuration: the non-blank, non-comment lines of a `.cfg` file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigScript {
    lines: Vec<String>,
}

impl ConfigScript {
    /// Parse configuration text. Lines are trimmed; blank lines and lines starting with
    /// `%` are dropped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('%'))
            .map(ToString::to_string)
            .collect();
        ConfigScript { lines }
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    /// If the file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct SendOpts {
    /// Pause before each line.
    #[builder(default = Duration::from_millis(30))]
    pub line_delay: Duration,
    /// Pause after the last line before clearing the input buffer.
    #[builder(default = Duration::from_millis(100))]
    pub settle: Duration,
}

impl Default for SendOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The new baud rate requested by `line`, if it is a `baudRate` command.
fn baud_rate_change(line: &str) -> Option<Result<u32>> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("baudRate") {
        return None;
    }
    let value = tokens.next()?;
    Some(value.parse::<u32>().map_err(|err| Error::ConfigSend {
        line: line.to_string(),
        reason: format!("invalid baud rate {value:?}: {err}"),
    }))
}

/// Read one acknowledgement line. Returns whatever arrived before a newline or the
/// read timeout, which may be nothing.
fn read_ack<P>(port: &mut P) -> std::io::Result<String>
where
    P: CommandPort + ?Sized,
{
    let mut ack = Vec::new();
    let mut buf = [0u8; 1];
    loop {
        match port.read(&mut buf) {
            Ok(0) => break,
            Ok(_) if buf[0] == b'\n' => break,
            Ok(_) => {
                if ack.len() < MAX_ACK_LEN {
                    ack.push(buf[0]);
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                break
            }
            Err(err) => return Err(err),
        }
    }
    Ok(String::from_utf8_lossy(&ack).trim_end().to_string())
}

/// Send `script` line by line over the command channel.
///
/// Each line is preceded by `opts.line_delay` and followed by reading one
/// acknowledgement line. A `baudRate <n>` line switches the channel to `n` baud once
/// its acknowledgement has been read. After the last line the input buffer is cleared
/// following `opts.settle`.
///
/// # Errors
/// [Error::ConfigSend] naming the line that failed to write, acknowledge or apply.
pub fn send_config<P>(port: &mut P, script: &ConfigScript, opts: &SendOpts) -> Result<()>
where
    P: CommandPort + ?Sized,
{
    info!("sending {} configuration lines", script.lines().len());
    for line in script.lines() {
        let fail = |reason: String| Error::ConfigSend {
            line: line.clone(),
            reason,
        };
        // Validate before sending so a bad rate never reaches the sensor.
        let baud = baud_rate_change(line).transpose()?;

        thread::sleep(opts.line_delay);
        port.write_all(format!("{line}\n").as_bytes())
            .and_then(|()| port.flush())
            .map_err(|err| fail(format!("write failed: {err}")))?;

        let ack = read_ack(port).map_err(|err| fail(format!("ack read failed: {err}")))?;
        if ack.is_empty() {
            debug!("no ACK for {line:?}");
        } else {
            debug!("ACK: {ack}");
        }

        if let Some(baud) = baud {
            info!("changing command channel baud rate to {baud}");
            port.set_baud_rate(baud)
                .map_err(|err| fail(format!("baud rate change failed: {err}")))?;
        }
    }

    thread::sleep(opts.settle);
    port.clear_input().map_err(|err| Error::ConfigSend {
        line: String::new(),
        reason: format!("failed to clear input: {err}"),
    })?;
    info!("configuration sent");
    Ok(())
}
