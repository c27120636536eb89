//! Rotoflux - rotating-coil magnetometer bench.
//!
//! Wires the virtual rig (coil + motor) to the calculation engine over the
//! message bus and logs the measured field.
//!
//! # Usage
//!
//! ```bash
//! # Run with the default virtual rig
//! cargo run --release
//!
//! # Custom rig: 2400 Hz sampling, hann window, rotor at 25 Hz
//! cargo run --release -- --sample-rate 2400 --window hann --motor-freq 25
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use rotoflux::acquisition::{AdcComponent, VirtualCoil, VirtualMotor};
use rotoflux::bus::{Message, MessageBus};
use rotoflux::calculation::{CalculationComponent, CalculationConfig};
use rotoflux::config::{defaults, Settings};
use rotoflux::processing::WindowKind;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "rotoflux")]
#[command(about = "Rotating-coil magnetometer engine")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML settings file
    #[arg(long, default_value = "rotoflux.toml")]
    config: String,

    /// Override the sampling rate (Hz)
    #[arg(long)]
    sample_rate: Option<f64>,

    /// Override the analysis frame duration (seconds); sets nsig = ntot
    #[arg(long)]
    acquisition_time: Option<f64>,

    /// Override the analysis window (rectangular, hann, hamming, blackman,
    /// blackman-harris)
    #[arg(long)]
    window: Option<WindowKind>,

    /// Override the peak threshold (multiple of the noise floor)
    #[arg(long)]
    min_snr: Option<f64>,

    /// Keep the sample buffer between frames (sliding-window spectra)
    #[arg(long)]
    rolling: bool,

    /// Override the virtual rotor frequency (Hz)
    #[arg(long)]
    motor_freq: Option<f64>,
}

// ============================================================================
// Settings assembly
// ============================================================================

fn assemble_settings(args: &CliArgs) -> Result<Settings> {
    let mut settings = Settings::load_or_default(std::path::Path::new(&args.config))
        .context("failed to load settings")?;

    if let Some(rate) = args.sample_rate {
        settings.acquisition.sample_rate = rate;
    }
    if let Some(t) = args.acquisition_time {
        let n = (settings.acquisition.sample_rate * t).round() as usize;
        settings.acquisition.nsig = n;
        settings.acquisition.ntot = n;
    }
    if let Some(window) = args.window {
        settings.acquisition.window = window;
    }
    if let Some(snr) = args.min_snr {
        settings.acquisition.min_snr = snr;
    }
    if args.rolling {
        settings.acquisition.rolling_fft = true;
    }
    if let Some(freq) = args.motor_freq {
        settings.virtual_rig.motor_freq = freq;
    }

    settings
        .validate()
        .map_err(|errors| anyhow::anyhow!("invalid settings: {}", errors.join("; ")))?;
    Ok(settings)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let settings = assemble_settings(&args)?;

    info!("🧲 Rotoflux starting");
    info!(
        "   Frame: {} samples @ {} Hz | window: {:?} | min SNR: {}",
        settings.acquisition.nsig,
        settings.acquisition.sample_rate,
        settings.acquisition.window,
        settings.acquisition.min_snr
    );

    let bus = MessageBus::new(defaults::BUS_CAPACITY);
    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();

    // Calculation engine
    let engine = CalculationComponent::new(bus.clone(), CalculationConfig::from(&settings));
    tasks.spawn(engine.run(cancel.clone()));

    // Virtual rig: sense coil + rotor
    let coil = VirtualCoil::new(
        settings.virtual_rig.tones.clone(),
        settings.acquisition.sample_rate,
        settings.virtual_rig.nbuf,
        settings.virtual_rig.noise_level,
        settings.virtual_rig.dc_offset,
    )
    .context("virtual coil")?;
    tasks.spawn(AdcComponent::new(bus.clone(), coil).run(cancel.clone()));

    let motor = VirtualMotor::new(
        bus.clone(),
        settings.virtual_rig.motor_freq,
        defaults::STEPS_PER_REV,
    )
    .context("virtual motor")?;
    tasks.spawn(motor.run(cancel.clone()));

    // Console sink: report the measurement stream
    tasks.spawn(report_measurements(bus.clone(), cancel.clone()));

    // Shutdown on ctrl-c
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            cancel.cancel();
        }
        _ = tasks.join_next() => {
            warn!("a component stopped unexpectedly, shutting down");
            cancel.cancel();
        }
    }

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            warn!(error = %e, "component task failed");
        }
    }

    info!("rotoflux stopped");
    Ok(())
}

/// Log the selected signal and field vector as frames come out.
async fn report_measurements(bus: MessageBus, cancel: CancellationToken) {
    let mut rx = bus.subscribe();
    let mut frames = 0u64;

    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = rx.recv() => msg,
        };
        match message {
            Ok(Message::SignalOfInterest(peak)) => {
                frames += 1;
                info!(
                    "📊 Frame {}: {:.2} Hz | {:.4} V | B = ({:+.3e}, {:+.3e}) T",
                    frames, peak.freq, peak.amplitude, peak.field.bx, peak.field.by
                );
            }
            Ok(Message::CalculationStatus(status)) => {
                info!(
                    "   Engine: nsig={} ntot={} window={:?} rolling={} min_snr={}",
                    status.nsig, status.ntot, status.window, status.rolling_fft, status.min_snr
                );
            }
            Ok(_) => {}
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                warn!(dropped = n, "reporter lagged behind the bus");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}
