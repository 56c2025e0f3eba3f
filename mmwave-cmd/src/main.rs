mod config;
mod info;
mod replay;
mod simulate;
mod stream;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mmwave::archive::ArchiveOpts;
use mmwave::settings::Settings;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Settings file (JSON). Defaults are used for anything not set.
    #[arg(short, long, global = true, value_name = "path")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Port options shared by the commands that talk to a sensor. Each overrides the
/// settings file value.
#[derive(clap::Args)]
struct PortArgs {
    /// Command (CLI) channel serial port.
    #[arg(long, value_name = "port")]
    cli_port: Option<String>,

    /// Data channel serial port.
    #[arg(long, value_name = "port")]
    data_port: Option<String>,

    /// Command channel baud rate.
    #[arg(long, value_name = "baud")]
    cli_baud: Option<u32>,

    /// Data channel baud rate.
    #[arg(long, value_name = "baud")]
    data_baud: Option<u32>,
}

impl PortArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(port) = &self.cli_port {
            settings.cli_port_name.clone_from(port);
        }
        if let Some(port) = &self.data_port {
            settings.data_port_name.clone_from(port);
        }
        if let Some(baud) = self.cli_baud {
            settings.cli_baud_rate = baud;
        }
        if let Some(baud) = self.data_baud {
            settings.data_baud_rate = baud;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decode frames from a connected sensor.
    ///
    /// Frames are printed as they arrive until --frames frames have been printed or
    /// --seconds have elapsed, whichever comes first. Without either, runs until killed.
    Stream {
        #[command(flatten)]
        ports: PortArgs,

        /// Send this configuration file before decoding.
        #[arg(short, long, value_name = "path")]
        config: Option<PathBuf>,

        /// Archive raw frames to this directory.
        #[arg(short, long, value_name = "dir")]
        archive: Option<PathBuf>,

        /// Frames per archive file.
        #[arg(long, default_value_t = mmwave::archive::DEFAULT_FRAMES_PER_FILE)]
        frames_per_file: usize,

        /// Attach target indices to the points of the frame they describe.
        #[arg(long, action)]
        associate_targets: bool,

        /// Stop after this many frames.
        #[arg(short = 'n', long)]
        frames: Option<usize>,

        /// Stop after this many seconds.
        #[arg(long)]
        seconds: Option<u64>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,
    },
    /// Decode and print the frames in an archive file.
    Replay {
        /// Input archive file
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,
    },
    /// Show information about an archive file.
    Info {
        /// Input archive file
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,
    },
    /// Send a configuration file to the sensor's command channel.
    Config {
        #[command(flatten)]
        ports: PortArgs,

        /// Configuration (.cfg) file.
        input: PathBuf,
    },
    /// Write synthetic frames to a file.
    Simulate {
        /// Number of frames.
        #[arg(short = 'n', long, default_value_t = 100)]
        frames: u32,

        /// Maximum points per frame.
        #[arg(short, long, default_value_t = 64)]
        points: usize,

        /// Maximum random garbage bytes before each frame.
        #[arg(short, long, default_value_t = 0)]
        garbage: usize,

        /// Encoding used for points.
        #[arg(short, long, default_value = "compressed")]
        encoding: simulate::Encoding,

        /// Delete output file if it already exists
        #[arg(long, action)]
        clobber: bool,

        /// Output file path.
        #[arg(short, long, default_value = "simulated.bin", value_name = "path")]
        output: PathBuf,
    },
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path).with_context(|| format!("loading settings {path:?}")),
        None => Ok(Settings::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("MMWAVE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Stream {
            ports,
            config,
            archive,
            frames_per_file,
            associate_targets,
            frames,
            seconds,
            format,
        } => {
            let mut settings = load_settings(cli.settings.as_ref())?;
            ports.apply(&mut settings);
            if let Some(dir) = archive {
                settings.archive = Some(
                    ArchiveOpts::builder()
                        .dir(dir.clone())
                        .frames_per_file(*frames_per_file)
                        .build(),
                );
            }
            settings.associate_targets |= *associate_targets;
            stream::stream(
                &settings,
                config.as_deref(),
                &stream::Limits {
                    frames: *frames,
                    seconds: *seconds,
                },
                format,
            )
        }
        Commands::Replay { input, format } => replay::replay(input, format),
        Commands::Info { input, format } => info::info(input, format),
        Commands::Config { ports, input } => {
            let mut settings = load_settings(cli.settings.as_ref())?;
            ports.apply(&mut settings);
            config::config(&settings, input)
        }
        Commands::Simulate {
            frames,
            points,
            garbage,
            encoding,
            clobber,
            output,
        } => {
            if !clobber && output.exists() {
                anyhow::bail!("{output:?} exists; use --clobber");
            }
            simulate::simulate(output, *frames, *points, *garbage, encoding)
        }
    }
}
