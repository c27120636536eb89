//! Core data types shared across the measurement pipeline.
//!
//! These are the payload shapes that travel over the message bus: spectra,
//! detected peaks, field vectors, and the status snapshots emitted by the
//! calculation engine and the acquisition front end.

use serde::{Deserialize, Serialize};

// ============================================================================
// Spectra
// ============================================================================

/// Single-sided spectrum on a fixed frequency axis.
///
/// `frequencies` and `values` are parallel; `values` holds magnitudes (volts)
/// on `fft_mags/data` and masked phases (degrees) on `fft_phases/data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumFrame {
    /// Frequency bins (Hz)
    pub frequencies: Vec<f64>,
    /// Value at each frequency bin
    pub values: Vec<f64>,
    /// Timestamp of the analysis frame
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl SpectrumFrame {
    pub fn new(frequencies: Vec<f64>, values: Vec<f64>) -> Self {
        Self {
            frequencies,
            values,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

// ============================================================================
// Peaks and Field Vectors
// ============================================================================

/// 2D magnetic field estimate in the fixed lab frame (tesla).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldVector {
    pub bx: f64,
    pub by: f64,
}

impl FieldVector {
    pub const ZERO: Self = Self { bx: 0.0, by: 0.0 };

    pub fn magnitude(&self) -> f64 {
        self.bx.hypot(self.by)
    }
}

/// One detected spectral peak, fully estimated.
///
/// `magnitude` is the raw single-sided spectrum value at the peak bin;
/// `amplitude` is the leakage-corrected voltage estimate from band-power
/// integration. `phase` is the spectrum phase at the peak bin, radians in
/// `[0, 2pi)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peak {
    /// Peak frequency (Hz)
    pub freq: f64,
    /// Spectrum magnitude at the peak bin (V)
    pub magnitude: f64,
    /// Spectrum phase at the peak bin (rad)
    pub phase: f64,
    /// Band-power amplitude estimate (V)
    pub amplitude: f64,
    /// Field vector attributed to this peak
    pub field: FieldVector,
}

// ============================================================================
// Collaborator readings
// ============================================================================

/// Latest rotor state published by the motor component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MotorReading {
    /// Rotor angle (rad), wrapped into `[0, 2pi)`
    pub theta: f64,
    /// Commanded rotation frequency (Hz), signed by direction
    pub freq: f64,
}

/// Acquisition front-end status announcement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdcStatus {
    /// Effective sampling rate (Hz)
    pub sample_rate: f64,
    /// Samples per published batch
    pub nbuf: usize,
}

// ============================================================================
// Engine configuration snapshot
// ============================================================================

/// Sense-coil geometry used for the Faraday inversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoilGeometry {
    /// Number of windings
    pub windings: f64,
    /// Cross-section area (m^2)
    pub area_m2: f64,
    /// Coil impedance (ohms)
    pub impedance_ohms: f64,
}

/// Configuration snapshot published on `calculation/status` after startup and
/// after every accepted reconfiguration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationStatus {
    pub nsig: usize,
    pub ntot: usize,
    pub window: crate::processing::WindowKind,
    pub rolling_fft: bool,
    pub min_snr: f64,
    pub sample_rate: f64,
    pub coil: CoilGeometry,
}
