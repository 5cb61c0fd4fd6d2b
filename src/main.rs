use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hidtrack::bridge::TrackBridge;
use hidtrack::config::{self, AppConfig, CONFIG_ENV};
use hidtrack::descriptor::{ControlProfile, ReportDescriptor};
use hidtrack::device::{DeviceIdentity, GadgetDevice, VirtualDevice};
use hidtrack::tracking::{PoseSource, UdpPoseSource};

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

/// Device profile selectable on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileArg {
    /// Generic desktop game pad
    Joystick,
    /// VR controls head tracker
    Vr,
}

impl From<ProfileArg> for ControlProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Joystick => ControlProfile::Joystick,
            ProfileArg::Vr => ControlProfile::Vr,
        }
    }
}

/// hidtrack command line arguments
#[derive(Parser, Debug)]
#[command(name = "hidtrack")]
#[command(version, about = "Head tracker to virtual USB HID device bridge", long_about = None)]
struct CliArgs {
    /// Device profile (overrides config file)
    #[arg(short = 'p', long, value_name = "PROFILE")]
    profile: Option<ProfileArg>,

    /// Configuration file (default: $HIDTRACK_CONFIG)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the report descriptor and exit
    #[arg(long)]
    dry_run: bool,

    /// Log level (error, warn, info, verbose, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Increase verbosity (-v for verbose, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_level, args.verbose);

    tracing::info!("Starting hidtrack v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.or_else(config_path_from_env);
    let mut config = config::load(config_path.as_deref())?;
    if let Some(profile) = args.profile {
        config.profile = profile.into();
    }
    tracing::info!("Using {} device", config.profile.description());

    let descriptor = build_descriptor(&config)?;
    tracing::debug!("Report descriptor ({} bytes):\n{}", descriptor.len(), descriptor.to_hex());

    if args.dry_run {
        print!("{}", descriptor.to_hex());
        return Ok(());
    }

    let mut device = GadgetDevice::new(&config.device);
    device
        .register(&DeviceIdentity::from(&config.device), &descriptor)
        .await
        .context("Failed to create device")?;

    let mut source = UdpPoseSource::bind(&config.tracker.bind_address).await?;
    let init_timeout = Duration::from_millis(config.tracker.init_timeout_ms);
    if let Err(e) = source.wait_ready(init_timeout).await {
        tracing::error!("Tracker doesn't work right: {}", e);
        tracing::error!("Make sure it is running and sending to {}", config.tracker.bind_address);
        if let Err(e) = device.unregister().await {
            tracing::warn!("{}", e);
        }
        return Err(e.into());
    }

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Interrupted by user");
        shutdown_signal.cancel();
    });

    let mut bridge = TrackBridge::new(
        device,
        source,
        config.axes.clone(),
        Duration::from_millis(config.poll_interval_ms),
    );
    bridge.run(shutdown).await;

    let (mut device, _) = bridge.into_parts();
    device.unregister().await?;
    tracing::info!("Finished");
    Ok(())
}

/// Build the descriptor declaring all six axes in report order
fn build_descriptor(config: &AppConfig) -> anyhow::Result<ReportDescriptor> {
    ReportDescriptor::build(
        config.profile,
        &config.axes.specs(),
        config.descriptor_capacity,
    )
    .context("Failed to build report descriptor")
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV).map(PathBuf::from)
}

/// Initialize logging with tracing
fn init_logging(level: LogLevel, verbose_count: u8) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Verbose,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "hidtrack=error",
        LogLevel::Warn => "hidtrack=warn",
        LogLevel::Info => "hidtrack=info",
        LogLevel::Verbose => "hidtrack=debug",
        LogLevel::Debug => "hidtrack=debug",
        LogLevel::Trace => "hidtrack=trace",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}
