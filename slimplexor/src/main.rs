//! SlimPlexor - command-line host
//!
//! Plays the part of the host framework: negotiates a stream, feeds raw
//! PCM from a file or stdin through the engine period by period, and
//! closes the stream at end of input.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use slimplexor::sink::{FileSinkProvider, SinkProvider};
use slimplexor::{
    EngineConfig, HostConstraints, HwParams, PcmPlugin, RateDeviceDirectory, SampleFormat,
    StreamSession, SwParams,
};
use slimplexor_common::config::load_config;
use slimplexor_common::logging::init_logging;
use slimplexor_common::{LogLevel, TomlConfig};
use tracing::{debug, info, warn};

/// Where repacked frames are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    /// `<output-dir>/<device>.raw`
    File,
    /// Audio output device of the same name
    Cpal,
}

/// Command-line arguments for slimplexor
#[derive(Parser, Debug)]
#[command(name = "slimplexor")]
#[command(about = "Repack PCM with a control channel and deliver it to the device mapped to its rate")]
#[command(version)]
struct Args {
    /// Configuration file (overrides SLIMPLEXOR_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Raw interleaved PCM input, `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Source sample format (S8, S16_LE, S24_LE, S32_LE)
    #[arg(short, long, default_value = "S16_LE")]
    format: SampleFormat,

    /// Source channel count
    #[arg(long, default_value_t = 2)]
    channels: usize,

    /// Source sample rate in Hz
    #[arg(short, long, default_value_t = 44100)]
    rate: u32,

    /// Frames per period (default: 16384 bytes worth of source frames)
    #[arg(long)]
    period_frames: Option<usize>,

    /// Periods in the upstream buffer
    #[arg(long)]
    periods: Option<usize>,

    /// Directory for the file sink
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Cap frames accepted per write by the file sink
    #[arg(long)]
    max_frames_per_write: Option<usize>,

    /// Sink implementation
    #[arg(long, value_enum, default_value_t = SinkKind::File)]
    sink: SinkKind,

    /// Log level (overrides the configuration file)
    #[arg(long, env = "SLIMPLEXOR_LOG_LEVEL")]
    log_level: Option<LogLevel>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging).context("Failed to initialise logging")?;

    info!("Starting SlimPlexor v{}", env!("CARGO_PKG_VERSION"));
    log_configuration(&config);

    let constraints = HostConstraints::default();
    let defaults = constraints.hw_params(args.format, args.channels, args.rate);
    let params = HwParams {
        period_frames: args.period_frames.unwrap_or(defaults.period_frames),
        periods: args.periods.unwrap_or(defaults.periods),
        ..defaults
    };
    for violation in constraints.check(&params) {
        warn!("Outside host constraints: {}", violation);
    }

    let directory = Arc::new(RateDeviceDirectory::from_config(&config));
    let provider = build_provider(&args)?;
    let mut session = StreamSession::new(directory, provider, EngineConfig::from_config(&config));

    let input = open_input(&args.input)?;
    let result = run(&mut session, &params, input);
    session.close();

    let frames = result?;
    info!("Transferred {} frames", frames);
    Ok(())
}

fn log_configuration(config: &TomlConfig) {
    debug!("Log level: {}", config.logging.level);
    if let Some(path) = &config.logging.file {
        debug!("Log file: {}", path.display());
    }
    if let Some(path) = &config.dump_file {
        debug!("PCM dump file: {}", path.display());
    }
    for entry in &config.rate_devices {
        debug!("Rate {} -> {}", entry.rate, entry.device);
    }
}

fn build_provider(args: &Args) -> Result<Box<dyn SinkProvider>> {
    match args.sink {
        SinkKind::File => {
            let mut provider = FileSinkProvider::new(&args.output_dir);
            if let Some(frames) = args.max_frames_per_write {
                provider = provider.with_max_frames_per_write(frames);
            }
            info!("Writing device streams to {}", args.output_dir.display());
            Ok(Box::new(provider))
        }
        SinkKind::Cpal => cpal_provider(),
    }
}

#[cfg(feature = "cpal")]
fn cpal_provider() -> Result<Box<dyn SinkProvider>> {
    use slimplexor::sink::CpalSinkProvider;

    let devices = CpalSinkProvider::list_devices().context("Failed to list audio devices")?;
    debug!("Audio output devices: {:?}", devices);
    Ok(Box::new(CpalSinkProvider::new()))
}

#[cfg(not(feature = "cpal"))]
fn cpal_provider() -> Result<Box<dyn SinkProvider>> {
    bail!("this build has no audio device support (enable the `cpal` feature)")
}

fn open_input(input: &str) -> Result<Box<dyn Read>> {
    if input == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(input).with_context(|| format!("Failed to open input {}", input))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Read until `buf` is full or input ends; returns bytes read
fn read_chunk(input: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Drive one stream from negotiation to stop; returns frames consumed
fn run(
    session: &mut StreamSession,
    params: &HwParams,
    mut input: Box<dyn Read>,
) -> Result<u64> {
    session
        .configure_hardware(params)
        .context("Hardware configuration failed")?;
    session
        .configure_software(&SwParams {
            start_threshold: params.buffer_frames(),
            avail_min: params.period_frames,
        })
        .context("Software configuration failed")?;
    session.prepare().context("Prepare failed")?;
    session.start()?;

    let frame_size = params.layout().source_frame_size();
    if frame_size == 0 {
        bail!("source frames must carry at least one channel");
    }

    let mut chunk = vec![0u8; params.period_frames * frame_size];
    // Wait a quarter period for the destination to take data
    let backoff = Duration::from_secs_f64(params.period_frames as f64 / params.rate as f64 / 4.0);
    let mut total: u64 = 0;

    loop {
        let read = read_chunk(input.as_mut(), &mut chunk).context("Failed to read input")?;
        if read == 0 {
            break;
        }
        if read % frame_size != 0 {
            warn!("Dropping {} trailing bytes of a partial frame", read % frame_size);
        }

        let frames = read / frame_size;
        let mut offset = 0;
        while offset < frames {
            let consumed = session
                .transfer(&chunk[offset * frame_size..read], frames - offset)
                .context("Transfer failed")?;
            if consumed == 0 {
                std::thread::sleep(backoff);
                continue;
            }
            offset += consumed;
            total += consumed as u64;
        }
        debug!("Pointer at {}", session.pointer());
    }

    session.stop()?;
    Ok(total)
}
