//! Numeric pipeline: windowing, spectral estimation, peak detection,
//! amplitude estimation, phase referencing, and field conversion.
//!
//! Everything in this module is pure and synchronous; the calculation
//! component feeds it buffer snapshots and runs it on a blocking worker.

mod amplitude;
mod field;
mod peaks;
mod phase;
mod spectrum;
mod windows;

pub use amplitude::estimate_amplitude;
pub use field::to_field;
pub use peaks::{detect_peaks, noise_floor, PeakCandidate};
pub use phase::{observed_angular_velocity, reference_angles};
pub use spectrum::estimate_spectrum;
pub use windows::{AnalysisWindow, UnknownWindow, WindowKind};

use thiserror::Error;

/// Errors in the numeric pipeline.
///
/// All of these are per-frame preconditions: the engine logs them, skips the
/// frame, and keeps accumulating. None are fatal.
#[derive(Error, Debug, PartialEq)]
pub enum ProcessingError {
    #[error("invalid analysis length: nsig={nsig}, ntot={ntot}")]
    InvalidLength { nsig: usize, ntot: usize },

    #[error("target frequency {target:.3} Hz outside spectrum axis [{first:.3}, {last:.3}]")]
    FrequencyOutOfRange { target: f64, first: f64, last: f64 },

    #[error("angular frequency is zero, field inversion undefined")]
    DegenerateFrequency,
}
