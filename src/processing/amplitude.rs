//! Band-power amplitude estimation.
//!
//! A windowed FFT leaks tone energy into neighbouring bins, so a single-bin
//! read-out under-estimates the true amplitude. Integrating power over a small
//! band around the peak and dividing by the window's equivalent noise
//! bandwidth recovers a calibrated voltage.

use super::ProcessingError;
use crate::types::SpectrumFrame;

/// Estimate the voltage amplitude of a tone near `target_freq`.
///
/// # Arguments
/// * `magnitude_frame` - single-sided magnitude spectrum
/// * `target_freq` - frequency of the detected peak (Hz)
/// * `freq_calc_range` - half-width of the integration band (Hz)
/// * `enbw` - equivalent noise bandwidth of the analysis window
///
/// Sums `freq_res * magnitude^2` over all bins within `freq_calc_range` of the
/// bin nearest `target_freq`, corrects the power by `enbw`, and returns the
/// square root.
///
/// A `target_freq` outside the frame's axis is rejected with
/// `FrequencyOutOfRange`. An integration band that would run past either end
/// of the spectrum is clamped to the valid bins; the clamped band then spans
/// fewer bins than requested, slightly biasing the estimate low. Rejecting
/// instead would make every peak within `freq_calc_range` of DC or Nyquist
/// unusable, so clamping is the chosen policy (pinned by tests).
pub fn estimate_amplitude(
    magnitude_frame: &SpectrumFrame,
    target_freq: f64,
    freq_calc_range: f64,
    enbw: f64,
) -> Result<f64, ProcessingError> {
    let freqs = &magnitude_frame.frequencies;
    let values = &magnitude_frame.values;
    let bin_count = freqs.len();
    if bin_count == 0 {
        return Err(ProcessingError::FrequencyOutOfRange {
            target: target_freq,
            first: f64::NAN,
            last: f64::NAN,
        });
    }

    let first = freqs[0];
    let last = freqs[bin_count - 1];
    if target_freq < first || target_freq > last {
        return Err(ProcessingError::FrequencyOutOfRange {
            target: target_freq,
            first,
            last,
        });
    }

    let freq_res = (last - first) / bin_count as f64;
    let idx_range = (freq_calc_range / freq_res).floor() as usize;

    // Bin nearest the target; the axis is uniform so this is a direct index
    // on the true bin spacing.
    let idx = if bin_count > 1 {
        let spacing = (last - first) / (bin_count - 1) as f64;
        ((target_freq - first) / spacing)
            .round()
            .clamp(0.0, (bin_count - 1) as f64) as usize
    } else {
        0
    };

    let lo = idx.saturating_sub(idx_range);
    let hi = idx.saturating_add(idx_range).min(bin_count - 1);

    let raw_power: f64 = values[lo..=hi].iter().map(|m| freq_res * m * m).sum();
    Ok((raw_power / enbw).sqrt())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(df: f64, values: Vec<f64>) -> SpectrumFrame {
        let freqs = (0..values.len()).map(|i| i as f64 * df).collect();
        SpectrumFrame::new(freqs, values)
    }

    #[test]
    fn single_bin_tone_recovers_its_magnitude() {
        let mut values = vec![0.0; 601];
        values[50] = 1.0;
        let f = frame(1.0, values);

        // freq_res = 600/601; idx_range = 3; only bin 50 carries power.
        let amp = estimate_amplitude(&f, 50.0, 3.0, 1.0).unwrap();
        let freq_res: f64 = 600.0 / 601.0;
        assert!(
            (amp - freq_res.sqrt()).abs() < 1e-12,
            "amplitude {amp} vs expected {}",
            freq_res.sqrt()
        );
        // Within a fraction of a percent of the true 1.0 V.
        assert!((amp - 1.0).abs() < 0.01);
    }

    #[test]
    fn enbw_corrects_spread_power() {
        let mut values = vec![0.0; 601];
        values[49] = 0.5;
        values[50] = 1.0;
        values[51] = 0.5;
        let f = frame(1.0, values);

        // Hann-like spread: total power 1.5x the center bin; ENBW 1.5 undoes it.
        let amp = estimate_amplitude(&f, 50.0, 3.0, 1.5).unwrap();
        assert!((amp - 1.0).abs() < 0.01, "amplitude {amp}");
    }

    #[test]
    fn target_outside_axis_is_rejected() {
        let f = frame(1.0, vec![0.0; 100]);
        let err = estimate_amplitude(&f, 150.0, 3.0, 1.0).unwrap_err();
        match err {
            ProcessingError::FrequencyOutOfRange { target, .. } => {
                assert!((target - 150.0).abs() < 1e-12)
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(estimate_amplitude(&f, -1.0, 3.0, 1.0).is_err());
    }

    #[test]
    fn band_is_clamped_at_spectrum_edges() {
        // Peak one bin from DC: the band [idx-3, idx+3] would start at -2.
        let mut values = vec![0.0; 100];
        values[1] = 2.0;
        let f = frame(1.0, values);

        let amp = estimate_amplitude(&f, 1.0, 3.0, 1.0).unwrap();
        let freq_res: f64 = 99.0 / 100.0;
        // Clamping keeps the computation alive and sums the surviving bins.
        assert!((amp - (freq_res * 4.0).sqrt()).abs() < 1e-12);

        // Same at the Nyquist end.
        let mut values = vec![0.0; 100];
        values[99] = 2.0;
        let f = frame(1.0, values);
        assert!(estimate_amplitude(&f, 99.0, 3.0, 1.0).is_ok());
    }

    #[test]
    fn band_width_follows_freq_calc_range() {
        // Two tones 5 bins apart; a 3 Hz band around the first must not
        // swallow the second (freq_res ~ 1 Hz -> idx_range 2).
        let mut values = vec![0.0; 200];
        values[100] = 1.0;
        values[105] = 1.0;
        let f = frame(1.0, values);

        let amp = estimate_amplitude(&f, 100.0, 2.9, 1.0).unwrap();
        let freq_res: f64 = 199.0 / 200.0;
        assert!(
            (amp - freq_res.sqrt()).abs() < 1e-9,
            "neighbouring tone leaked into the band: {amp}"
        );
    }
}
