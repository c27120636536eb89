//! Runtime reconfiguration commands.
//!
//! A command is a partial update: every field is optional, and the legal
//! field set is fixed by this struct rather than discovered by reflection.
//! Unknown fields fail deserialization, so a typo in a client payload rejects
//! the whole update before any of it is applied.

use serde::{Deserialize, Serialize};

use super::{CalculationConfig, EngineError};
use crate::processing::WindowKind;
use crate::types::CoilGeometry;

/// Partial update to [`CalculationConfig`].
///
/// Application is all-or-nothing: the update is applied to a candidate copy,
/// the candidate is validated, and only a fully valid candidate replaces the
/// live configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalculationCommand {
    /// Desired frame duration in seconds; recomputes `nsig = ntot =
    /// round(sample_rate * acquisition_time)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_time: Option<f64>,

    /// Analysis frame length (samples). Takes precedence over a derived
    /// `acquisition_time` value in the same command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsig: Option<usize>,

    /// Zero-padded FFT length. Same precedence rule as `nsig`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ntot: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_snr: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolling_fft: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub coil: Option<CoilGeometry>,
}

impl CalculationCommand {
    /// Parse a raw `calculation/command` payload.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, EngineError> {
        serde_json::from_value(payload.clone())
            .map_err(|e| EngineError::UnknownConfigField(e.to_string()))
    }

    /// Produce the configuration this command would result in.
    ///
    /// The current configuration is never touched; a validation failure
    /// leaves the caller holding the old value, which is the rollback.
    pub fn apply(&self, current: &CalculationConfig) -> Result<CalculationConfig, EngineError> {
        let mut next = current.clone();

        if let Some(t) = self.acquisition_time {
            if t <= 0.0 || !t.is_finite() {
                return Err(EngineError::InvalidConfig(vec![format!(
                    "acquisition_time ({t}) must be a positive duration"
                )]));
            }
            let n = (next.sample_rate * t).round() as usize;
            next.nsig = n;
            next.ntot = n;
        }
        if let Some(n) = self.nsig {
            next.nsig = n;
        }
        if let Some(n) = self.ntot {
            next.ntot = n;
        }
        if let Some(w) = self.window {
            next.window = w;
        }
        if let Some(s) = self.min_snr {
            next.min_snr = s;
        }
        if let Some(r) = self.rolling_fft {
            next.rolling_fft = r;
        }
        if let Some(c) = self.coil {
            next.coil = c;
        }

        next.validate().map_err(EngineError::InvalidConfig)?;
        Ok(next)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_config() -> CalculationConfig {
        CalculationConfig {
            nsig: 1024,
            ntot: 1024,
            rolling_fft: false,
            window: WindowKind::Rectangular,
            min_snr: 5.0,
            sample_rate: 1200.0,
            coil: CoilGeometry {
                windings: 1000.0,
                area_m2: 0.01,
                impedance_ohms: 90.0,
            },
        }
    }

    #[test]
    fn unknown_field_rejects_entire_update() {
        let payload = json!({ "min_snr": 10.0, "bogus_field": 1 });
        let err = CalculationCommand::from_payload(&payload).unwrap_err();
        assert!(matches!(err, EngineError::UnknownConfigField(_)));

        // Nothing to apply: the configuration is untouched by construction.
        let config = base_config();
        assert_eq!(config, base_config());
    }

    #[test]
    fn acquisition_time_recomputes_frame_lengths() {
        let cmd = CalculationCommand::from_payload(&json!({ "acquisition_time": 0.5 }))
            .expect("parse");
        let next = cmd.apply(&base_config()).expect("apply");
        assert_eq!(next.nsig, 600);
        assert_eq!(next.ntot, 600);
    }

    #[test]
    fn explicit_lengths_override_acquisition_time() {
        let cmd = CalculationCommand::from_payload(
            &json!({ "acquisition_time": 0.5, "ntot": 2048, "nsig": 512 }),
        )
        .expect("parse");
        let next = cmd.apply(&base_config()).expect("apply");
        assert_eq!(next.nsig, 512);
        assert_eq!(next.ntot, 2048);
    }

    #[test]
    fn direct_field_updates_apply() {
        let cmd = CalculationCommand::from_payload(&json!({
            "window": "hann",
            "min_snr": 8.0,
            "rolling_fft": true,
            "coil": { "windings": 500.0, "area_m2": 0.02, "impedance_ohms": 45.0 }
        }))
        .expect("parse");
        let next = cmd.apply(&base_config()).expect("apply");
        assert_eq!(next.window, WindowKind::Hann);
        assert!((next.min_snr - 8.0).abs() < 1e-12);
        assert!(next.rolling_fft);
        assert!((next.coil.windings - 500.0).abs() < 1e-12);
        // Untouched fields survive.
        assert_eq!(next.nsig, 1024);
    }

    #[test]
    fn invalid_values_roll_back_entirely() {
        // min_snr is fine, ntot < nsig is not: nothing may be applied.
        let cmd = CalculationCommand::from_payload(&json!({ "min_snr": 9.0, "ntot": 16 }))
            .expect("parse");
        let config = base_config();
        let err = cmd.apply(&config).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
        assert_eq!(config, base_config(), "rejected update must leave config unchanged");
    }

    #[test]
    fn zero_acquisition_time_is_rejected() {
        let cmd = CalculationCommand::from_payload(&json!({ "acquisition_time": 0.0 }))
            .expect("parse");
        assert!(cmd.apply(&base_config()).is_err());
    }

    #[test]
    fn empty_command_is_a_noop() {
        let cmd = CalculationCommand::from_payload(&json!({})).expect("parse");
        let next = cmd.apply(&base_config()).expect("apply");
        assert_eq!(next, base_config());
    }
}
