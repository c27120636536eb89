//! Windowed spectral estimation via real-input FFT.
//!
//! Produces single-sided magnitude and phase spectra on the zero-padded
//! frequency grid `rfftfreq(ntot, d = period / nsig)`.

use num_complex::Complex;
use rustfft::FftPlanner;
use std::f64::consts::PI;

use super::{AnalysisWindow, ProcessingError};
use crate::types::SpectrumFrame;

/// Estimate the single-sided magnitude and phase spectra of one frame.
///
/// # Arguments
/// * `samples` - raw voltage frame (length `nsig`)
/// * `period_total_seconds` - total duration of the frame in seconds
/// * `window` - analysis window to apply
/// * `ntot` - FFT length; zero-padded when `ntot > nsig`
///
/// # Returns
/// `(magnitude, phase)` frames, both `ntot / 2 + 1` bins long on the same
/// frequency axis.
///
/// Magnitudes are coherent-gain corrected and doubled at all interior bins
/// (single-sided correction sparing DC and the last bin). Phases are the FFT
/// angle shifted by +pi into `[0, 2pi)`; downstream peak/phase matching relies
/// on this shifted convention, so it must not be normalised back to
/// `[-pi, pi)`.
pub fn estimate_spectrum(
    samples: &[f64],
    period_total_seconds: f64,
    window: &AnalysisWindow,
    ntot: usize,
) -> Result<(SpectrumFrame, SpectrumFrame), ProcessingError> {
    let nsig = samples.len();
    if nsig == 0 || ntot < nsig {
        return Err(ProcessingError::InvalidLength { nsig, ntot });
    }

    // Window with amplitude correction baked in.
    let taper = window.samples(nsig);
    let mut buffer: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); ntot];
    for (slot, (&s, &w)) in buffer.iter_mut().zip(samples.iter().zip(taper.iter())) {
        slot.re = s * w / window.coherent_gain;
    }

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(ntot).process(&mut buffer);

    let nbins = ntot / 2 + 1;
    let scale = 1.0 / nsig as f64;

    let mut magnitudes = Vec::with_capacity(nbins);
    let mut phases = Vec::with_capacity(nbins);
    for (k, bin) in buffer.iter().take(nbins).enumerate() {
        let mut mag = bin.norm() * scale;
        if k > 0 && k < nbins - 1 {
            mag *= 2.0;
        }
        magnitudes.push(mag);
        phases.push(bin.arg() + PI);
    }

    // rfftfreq(ntot, d = period / nsig): spacing nsig / (ntot * period).
    let df = nsig as f64 / (ntot as f64 * period_total_seconds);
    let frequencies: Vec<f64> = (0..nbins).map(|k| k as f64 * df).collect();

    Ok((
        SpectrumFrame::new(frequencies.clone(), magnitudes),
        SpectrumFrame::new(frequencies, phases),
    ))
}

// ============================================================================
// Tests
// ============================================================================
