//! Calculation engine: buffering, orchestration, and runtime reconfiguration.
//!
//! The component in this module owns the rolling sample/angle buffers, runs
//! the numeric pipeline from [`crate::processing`] on frame snapshots, and
//! publishes results on the message bus.

mod buffers;
mod command;
mod component;

pub use buffers::RingBuffer;
pub use command::CalculationCommand;
pub use component::CalculationComponent;

use thiserror::Error;

use crate::config::Settings;
use crate::processing::{ProcessingError, WindowKind};
use crate::types::{CalculationStatus, CoilGeometry};

// ============================================================================
// Runtime Configuration
// ============================================================================

/// Live engine configuration.
///
/// Mutated only through [`CalculationCommand`] under the engine lock, since a
/// change to `nsig` must resize the buffers atomically with respect to
/// concurrent ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationConfig {
    /// Analysis frame length (samples)
    pub nsig: usize,
    /// Zero-padded FFT length, >= nsig
    pub ntot: usize,
    /// Keep the sample buffer between frames
    pub rolling_fft: bool,
    /// Analysis window
    pub window: WindowKind,
    /// Peak prominence threshold (multiple of the noise floor)
    pub min_snr: f64,
    /// Sampling rate (Hz)
    pub sample_rate: f64,
    /// Sense-coil geometry
    pub coil: CoilGeometry,
}

impl CalculationConfig {
    /// Check the configuration invariants, collecting all failures.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.nsig == 0 {
            errors.push("nsig must be > 0".to_string());
        }
        if self.ntot < self.nsig {
            errors.push(format!(
                "ntot ({}) must be >= nsig ({})",
                self.ntot, self.nsig
            ));
        }
        if self.min_snr <= 0.0 {
            errors.push(format!("min_snr ({}) must be > 0", self.min_snr));
        }
        if self.sample_rate <= 0.0 {
            errors.push(format!("sample_rate ({}) must be > 0", self.sample_rate));
        }
        for (name, value) in [
            ("coil.windings", self.coil.windings),
            ("coil.area_m2", self.coil.area_m2),
            ("coil.impedance_ohms", self.coil.impedance_ohms),
        ] {
            if value <= 0.0 {
                errors.push(format!("{name} ({value}) must be > 0"));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Snapshot for `calculation/status`.
    pub fn status(&self) -> CalculationStatus {
        CalculationStatus {
            nsig: self.nsig,
            ntot: self.ntot,
            window: self.window,
            rolling_fft: self.rolling_fft,
            min_snr: self.min_snr,
            sample_rate: self.sample_rate,
            coil: self.coil,
        }
    }
}

impl From<&Settings> for CalculationConfig {
    fn from(settings: &Settings) -> Self {
        let acq = &settings.acquisition;
        Self {
            nsig: acq.nsig,
            ntot: acq.ntot,
            rolling_fft: acq.rolling_fft,
            window: acq.window,
            min_snr: acq.min_snr,
            sample_rate: acq.sample_rate,
            coil: settings.coil.clone().into(),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by the calculation engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The reconfiguration payload named a field the engine does not have.
    /// The whole update is rejected; the previous configuration is retained.
    #[error("unknown configuration field: {0}")]
    UnknownConfigField(String),

    /// The reconfiguration payload was well-formed but violated an invariant.
    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    /// A per-frame numeric precondition failed; the frame is skipped.
    #[error(transparent)]
    Processing(#[from] ProcessingError),
}
