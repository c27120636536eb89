//! System-wide default constants.
//!
//! Centralises the magic numbers of the measurement pipeline. Grouped by
//! subsystem for easy discovery.

// ============================================================================
// Calculation Engine
// ============================================================================

/// Default analysis frame length in samples.
pub const DEFAULT_NSIG: usize = 1024;

/// Default zero-padded FFT length. Equal to the frame length: no padding.
pub const DEFAULT_NTOT: usize = 1024;

/// Default sampling rate (Hz) until the acquisition front end announces one.
pub const DEFAULT_SAMPLE_RATE: f64 = 1200.0;

/// Default peak-acceptance threshold as a multiple of the noise floor.
pub const DEFAULT_MIN_SNR: f64 = 5.0;

/// Fraction of (sorted) spectrum bins treated as noise when estimating the
/// floor. Genuine signal is assumed to occupy the remaining minority.
pub const NOISE_PERCENTILE: f64 = 0.9;

/// Half-width of the band integrated around a peak for amplitude estimation
/// (Hz).
pub const FREQ_CALC_RANGE_HZ: f64 = 3.0;

// ============================================================================
// Sense Coil
// ============================================================================

/// Default number of coil windings.
pub const DEFAULT_COIL_WINDINGS: f64 = 1000.0;

/// Default coil cross-section area (m^2): a 10 cm x 10 cm frame.
pub const DEFAULT_COIL_AREA_M2: f64 = 0.01;

/// Default coil impedance (ohms).
pub const DEFAULT_COIL_IMPEDANCE_OHMS: f64 = 90.0;

// ============================================================================
// Virtual Rig
// ============================================================================

/// Samples per batch published by the virtual ADC.
pub const DEFAULT_NBUF: usize = 32;

/// Gaussian noise level of the virtual coil, as a fraction of the batch's
/// standard deviation.
pub const DEFAULT_NOISE_LEVEL: f64 = 0.2;

/// DC offset of the virtual coil signal (V).
pub const DEFAULT_DC_OFFSET: f64 = 0.5;

/// Motor steps per revolution (one full-step bipolar stepper).
pub const STEPS_PER_REV: u32 = 200;

/// Default rotor frequency (Hz).
pub const DEFAULT_MOTOR_FREQ: f64 = 10.0;

// ============================================================================
// Messaging
// ============================================================================

/// Broadcast bus depth before slow subscribers start lagging.
pub const BUS_CAPACITY: usize = 64;
