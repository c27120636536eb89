//! Rig configuration loaded from a TOML file.
//!
//! Every field has a serde default, so a partial file (or none at all) yields
//! a runnable configuration. Validation collects every problem before
//! reporting, so a bad file fails once with the full list instead of
//! one-error-at-a-time.

pub mod defaults;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::processing::WindowKind;
use crate::types::CoilGeometry;

// ============================================================================
// Settings
// ============================================================================

/// Top-level settings file shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub acquisition: AcquisitionSettings,
    pub coil: CoilSettings,
    pub virtual_rig: VirtualRigSettings,
}

/// Analysis-frame and detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionSettings {
    /// Analysis frame length (samples)
    pub nsig: usize,
    /// Zero-padded FFT length; must be >= nsig
    pub ntot: usize,
    /// Keep the sample buffer between frames (sliding-window spectra)
    pub rolling_fft: bool,
    /// Analysis window
    pub window: WindowKind,
    /// Peak prominence threshold, as a multiple of the noise floor
    pub min_snr: f64,
    /// Sampling rate (Hz); overridden by the front end's `adc/status`
    pub sample_rate: f64,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            nsig: defaults::DEFAULT_NSIG,
            ntot: defaults::DEFAULT_NTOT,
            rolling_fft: false,
            window: WindowKind::Rectangular,
            min_snr: defaults::DEFAULT_MIN_SNR,
            sample_rate: defaults::DEFAULT_SAMPLE_RATE,
        }
    }
}

/// Sense-coil geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoilSettings {
    pub windings: f64,
    pub area_m2: f64,
    pub impedance_ohms: f64,
}

impl Default for CoilSettings {
    fn default() -> Self {
        Self {
            windings: defaults::DEFAULT_COIL_WINDINGS,
            area_m2: defaults::DEFAULT_COIL_AREA_M2,
            impedance_ohms: defaults::DEFAULT_COIL_IMPEDANCE_OHMS,
        }
    }
}

impl From<CoilSettings> for CoilGeometry {
    fn from(s: CoilSettings) -> Self {
        CoilGeometry {
            windings: s.windings,
            area_m2: s.area_m2,
            impedance_ohms: s.impedance_ohms,
        }
    }
}

/// Parameters of the synthetic ADC and motor used without hardware.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualRigSettings {
    /// Samples per published voltage batch
    pub nbuf: usize,
    /// Synthetic tones as (frequency Hz, amplitude V) pairs
    pub tones: Vec<(f64, f64)>,
    /// Gaussian noise level, fraction of the batch standard deviation
    pub noise_level: f64,
    /// DC offset (V)
    pub dc_offset: f64,
    /// Rotor frequency (Hz), signed by direction
    pub motor_freq: f64,
}

impl Default for VirtualRigSettings {
    fn default() -> Self {
        Self {
            nbuf: defaults::DEFAULT_NBUF,
            tones: vec![(5.0, 1.0), (10.0, 3.0), (20.0, 5.0)],
            noise_level: defaults::DEFAULT_NOISE_LEVEL,
            dc_offset: defaults::DEFAULT_DC_OFFSET,
            motor_freq: defaults::DEFAULT_MOTOR_FREQ,
        }
    }
}

// ============================================================================
// Loading & Validation
// ============================================================================

impl Settings {
    /// Load settings from `path`, or fall back to defaults when the file does
    /// not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "settings file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::Io(path.to_path_buf(), e))?;
        let settings: Settings =
            toml::from_str(&raw).map_err(|e| SettingsError::Parse(path.to_path_buf(), e))?;
        settings.validate().map_err(SettingsError::Validation)?;
        Ok(settings)
    }

    /// Check every invariant, collecting all failures.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let acq = &self.acquisition;

        if acq.nsig == 0 {
            errors.push("acquisition.nsig must be > 0".to_string());
        }
        if acq.ntot < acq.nsig {
            errors.push(format!(
                "acquisition.ntot ({}) must be >= acquisition.nsig ({})",
                acq.ntot, acq.nsig
            ));
        }
        if acq.min_snr <= 0.0 {
            errors.push(format!("acquisition.min_snr ({}) must be > 0", acq.min_snr));
        }
        if acq.sample_rate <= 0.0 {
            errors.push(format!(
                "acquisition.sample_rate ({}) must be > 0",
                acq.sample_rate
            ));
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
        if self.virtual_rig.nbuf == 0 {
            errors.push("virtual_rig.nbuf must be > 0".to_string());
        }
        if self.virtual_rig.noise_level < 0.0 {
            errors.push(format!(
                "virtual_rig.noise_level ({}) must be >= 0",
                self.virtual_rig.noise_level
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O error ({0}): {1}")]
    Io(PathBuf, std::io::Error),

    #[error("settings parse error ({0}): {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("settings validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Tests
// ============================================================================
