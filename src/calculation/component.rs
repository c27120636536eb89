//! The calculation component: ingestion, frame triggering, and emission.
//!
//! One task owns the bus subscription and mutates the buffers; the numeric
//! pipeline runs on a blocking worker against a copied-out frame snapshot, so
//! a slow FFT never blocks ingestion and a concurrent buffer resize can never
//! corrupt an in-flight frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{CalculationCommand, CalculationConfig, RingBuffer};
use crate::bus::{Message, MessageBus};
use crate::config::defaults::FREQ_CALC_RANGE_HZ;
use crate::processing::{
    detect_peaks, estimate_amplitude, estimate_spectrum, observed_angular_velocity,
    reference_angles, to_field, ProcessingError,
};
use crate::types::{AdcStatus, MotorReading, Peak, SpectrumFrame};

// ============================================================================
// Engine State
// ============================================================================

/// Everything mutated by ingestion and reconfiguration, behind one lock.
///
/// The lock is held only for appends, snapshots, and config swaps, never
/// across the FFT.
pub(crate) struct EngineState {
    pub(crate) config: CalculationConfig,
    pub(crate) samples: RingBuffer,
    pub(crate) angles: RingBuffer,
    /// Second-to-last rotor reading; interpolation start point.
    angle_prev: Option<f64>,
    /// Latest rotor reading; interpolation end point.
    angle_now: Option<f64>,
}

/// Copied-out analysis frame. Owns its data, so the engine lock is released
/// before any heavy computation starts.
#[derive(Debug, Clone)]
pub(crate) struct FrameSnapshot {
    pub(crate) samples: Vec<f64>,
    pub(crate) angles: Vec<f64>,
    pub(crate) config: CalculationConfig,
}

/// Everything one analysis frame emits.
#[derive(Debug)]
pub(crate) struct FrameOutput {
    pub(crate) magnitudes: SpectrumFrame,
    /// Phase spectrum in degrees, zeroed everywhere but the peak bins.
    pub(crate) phases_masked_deg: SpectrumFrame,
    pub(crate) peaks: Vec<Peak>,
    /// Peak nearest the rotation frequency, when any peak was found.
    pub(crate) selected: Option<Peak>,
}

impl EngineState {
    pub(crate) fn new(config: CalculationConfig) -> Self {
        let nsig = config.nsig;
        Self {
            config,
            samples: RingBuffer::new(nsig),
            angles: RingBuffer::new(nsig),
            angle_prev: None,
            angle_now: None,
        }
    }

    pub(crate) fn record_motor(&mut self, reading: MotorReading) {
        self.angle_prev = self.angle_now;
        self.angle_now = Some(reading.theta);
    }

    /// Append a voltage batch with interpolated per-sample angles.
    ///
    /// Returns true once a full analysis frame is available.
    pub(crate) fn ingest(&mut self, batch: &[f64]) -> bool {
        let now = self.angle_now.unwrap_or(0.0);
        let interpolated = reference_angles(self.angle_prev.or(self.angle_now), now, batch.len());
        self.samples.extend(batch);
        self.angles.extend(&interpolated);
        self.samples.len() >= self.config.nsig
    }

    /// Copy the current frame out; in non-rolling mode this drains both
    /// buffers, so samples arriving during the computation start the next
    /// frame instead of being discarded after it.
    pub(crate) fn take_frame(&mut self) -> FrameSnapshot {
        let snapshot = FrameSnapshot {
            samples: self.samples.snapshot(),
            angles: self.angles.snapshot(),
            config: self.config.clone(),
        };
        if !self.config.rolling_fft {
            self.samples.clear();
            self.angles.clear();
        }
        snapshot
    }

    /// Swap in a validated configuration, resizing the buffers when the frame
    /// length changed.
    pub(crate) fn commit_config(&mut self, next: CalculationConfig) {
        if next.nsig != self.config.nsig {
            self.samples.resize(next.nsig);
            self.angles.resize(next.nsig);
        }
        self.config = next;
    }

    pub(crate) fn set_sample_rate(&mut self, sample_rate: f64) {
        if sample_rate > 0.0 {
            self.config.sample_rate = sample_rate;
        }
    }
}

// ============================================================================
// Frame Analysis (pure)
// ============================================================================

/// Run the full numeric pipeline on one frame snapshot.
///
/// Any precondition failure aborts the whole frame: nothing is emitted and
/// the engine carries on with the next frame.
pub(crate) fn analyze_frame(snapshot: &FrameSnapshot) -> Result<FrameOutput, ProcessingError> {
    let config = &snapshot.config;
    // The snapshot was taken at >= nsig samples with capacity nsig; anything
    // else means the resize sequencing is broken.
    debug_assert_eq!(snapshot.samples.len(), config.nsig);
    debug_assert_eq!(snapshot.samples.len(), snapshot.angles.len());

    let period = snapshot.samples.len() as f64 / config.sample_rate;
    let window = config.window.properties();

    let (magnitudes, phases) =
        estimate_spectrum(&snapshot.samples, period, &window, config.ntot)?;
    let candidates = detect_peaks(&magnitudes, &phases, config.min_snr);

    let omega = observed_angular_velocity(&snapshot.angles, period);
    let theta_ref = snapshot.angles.first().copied().unwrap_or(0.0);

    let mut masked = vec![0.0; phases.len()];
    let mut peaks = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        masked[candidate.index] = candidate.phase.to_degrees();

        let amplitude =
            estimate_amplitude(&magnitudes, candidate.freq, FREQ_CALC_RANGE_HZ, window.enbw)?;
        // Phase-lock: the measured phase referenced to the rotor angle at the
        // start of the frame.
        let theta = (candidate.phase - theta_ref).rem_euclid(std::f64::consts::TAU);
        let field = to_field(amplitude, omega, theta, &config.coil)?;

        peaks.push(Peak {
            freq: candidate.freq,
            magnitude: candidate.magnitude,
            phase: candidate.phase,
            amplitude,
            field,
        });
    }

    // The physical rotation shows up at the rotor frequency; harmonics and
    // noise peaks sit elsewhere.
    let rotor_freq = omega.abs() / std::f64::consts::TAU;
    let selected = peaks
        .iter()
        .min_by(|a, b| {
            let da = (a.freq - rotor_freq).abs();
            let db = (b.freq - rotor_freq).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned();

    let phases_masked_deg = SpectrumFrame::new(phases.frequencies.clone(), masked);

    Ok(FrameOutput {
        magnitudes,
        phases_masked_deg,
        peaks,
        selected,
    })
}

// ============================================================================
// Calculation Component
// ============================================================================

/// Bus-driven calculation engine.
pub struct CalculationComponent {
    bus: MessageBus,
    state: Arc<Mutex<EngineState>>,
    analyzing: Arc<AtomicBool>,
}

impl CalculationComponent {
    pub fn new(bus: MessageBus, config: CalculationConfig) -> Self {
        Self {
            bus,
            state: Arc::new(Mutex::new(EngineState::new(config))),
            analyzing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run until cancellation. Subscribes to the bus, ingests voltage and
    /// rotor data, triggers analysis frames, and applies reconfiguration.
    pub async fn run(self, cancel: CancellationToken) {
        let mut rx = self.bus.subscribe();
        info!("starting calculation engine");
        self.publish_status();

        loop {
            let message = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[Calculation] shutdown signal received");
                    break;
                }
                msg = rx.recv() => msg,
            };

            match message {
                Ok(Message::VoltageData(batch)) => self.on_voltage(&batch),
                Ok(Message::MotorData(reading)) => self.on_motor(reading),
                Ok(Message::AdcStatus(status)) => self.on_adc_status(status),
                Ok(Message::CalculationCommand(payload)) => self.on_command(&payload),
                Ok(_) => {} // own egress topics
                Err(broadcast::error::RecvError::Lagged(dropped)) => {
                    warn!(dropped, "calculation engine lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("[Calculation] bus closed");
                    break;
                }
            }
        }
    }

    fn on_voltage(&self, batch: &[f64]) {
        let snapshot = {
            let mut state = lock(&self.state);
            if !state.ingest(batch) {
                return;
            }
            // One frame in flight at a time; rolling mode retriggers on the
            // next batch anyway.
            if self.analyzing.swap(true, Ordering::AcqRel) {
                debug!("analysis in flight, frame deferred");
                return;
            }
            state.take_frame()
        };

        let bus = self.bus.clone();
        let analyzing = self.analyzing.clone();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || analyze_frame(&snapshot)).await;
            match result {
                Ok(Ok(output)) => emit_frame(&bus, output),
                Ok(Err(e)) => warn!(error = %e, "analysis frame skipped"),
                Err(e) => warn!(error = %e, "analysis worker failed"),
            }
            analyzing.store(false, Ordering::Release);
        });
    }

    fn on_motor(&self, reading: MotorReading) {
        lock(&self.state).record_motor(reading);
    }

    fn on_adc_status(&self, status: AdcStatus) {
        debug!(sample_rate = status.sample_rate, "acquisition status");
        lock(&self.state).set_sample_rate(status.sample_rate);
    }

    fn on_command(&self, payload: &serde_json::Value) {
        let applied = CalculationCommand::from_payload(payload).and_then(|command| {
            let mut state = lock(&self.state);
            let next = command.apply(&state.config)?;
            state.commit_config(next);
            Ok(())
        });

        match applied {
            Ok(()) => {
                info!("configuration updated");
                self.publish_status();
            }
            Err(e) => {
                // Rejected update: report the retained configuration rather
                // than staying silent, so clients see their change was not
                // applied.
                warn!(error = %e, "reconfiguration rejected");
                self.publish_status();
            }
        }
    }

    fn publish_status(&self) {
        let status = lock(&self.state).config.status();
        self.bus.publish(Message::CalculationStatus(status));
    }
}

/// Lock helper: a poisoned engine lock means an ingest or reconfig panicked
/// mid-mutation; continuing with whatever state is there is still sound
/// because every mutation is a complete append/swap.
fn lock(state: &Arc<Mutex<EngineState>>) -> std::sync::MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn emit_frame(bus: &MessageBus, output: FrameOutput) {
    bus.publish(Message::FftMagnitudes(output.magnitudes));
    bus.publish(Message::FftPhases(output.phases_masked_deg));
    bus.publish(Message::Signals(output.peaks));
    if let Some(selected) = output.selected {
        let field = selected.field;
        bus.publish(Message::SignalOfInterest(Box::new(selected)));
        bus.publish(Message::FieldVector(field));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::WindowKind;
    use crate::types::CoilGeometry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};
    use std::f64::consts::TAU;

    fn test_config(nsig: usize, window: WindowKind) -> CalculationConfig {
        CalculationConfig {
            nsig,
            ntot: nsig,
            rolling_fft: false,
            window,
            min_snr: 5.0,
            sample_rate: 1200.0,
            coil: CoilGeometry {
                windings: 1000.0,
                area_m2: 0.01,
                impedance_ohms: 90.0,
            },
        }
    }

    /// 50 Hz rotor spinning in a static field: voltage at the rotation
    /// frequency plus a little measurement noise.
    fn spinning_frame(nsig: usize, amplitude: f64) -> FrameSnapshot {
        let sample_rate = 1200.0;
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 1e-3).expect("normal");

        let samples: Vec<f64> = (0..nsig)
            .map(|i| {
                let t = i as f64 / sample_rate;
                amplitude * (TAU * 50.0 * t).sin() + noise.sample(&mut rng)
            })
            .collect();
        let angles: Vec<f64> = (0..nsig)
            .map(|i| (TAU * 50.0 * i as f64 / sample_rate).rem_euclid(TAU))
            .collect();

        FrameSnapshot {
            samples,
            angles,
            config: test_config(nsig, WindowKind::Hann),
        }
    }

    #[test]
    fn end_to_end_single_tone_recovery() {
        // 1200 samples of a 1.0 V, 50 Hz tone at 1200 Hz, hann window,
        // min_snr 5: exactly one peak, amplitude within 5%.
        let output = analyze_frame(&spinning_frame(1200, 1.0)).expect("frame");

        assert_eq!(output.peaks.len(), 1, "expected exactly one detected peak");
        let peak = &output.peaks[0];
        assert!(
            (peak.freq - 50.0).abs() <= 1.0,
            "peak at {} Hz, expected ~50 Hz",
            peak.freq
        );
        assert!(
            (peak.amplitude - 1.0).abs() < 0.05,
            "estimated amplitude {} outside 5% of 1.0 V",
            peak.amplitude
        );

        // The selected signal is that same peak, and its field inverts
        // Faraday at omega = 2 pi 50.
        let selected = output.selected.as_ref().expect("selected signal");
        assert!((selected.freq - peak.freq).abs() < 1e-12);
        // The observed angular velocity spans nsig - 1 steps, so the inverted
        // field sits within a fraction of a percent of the ideal value.
        let expected_b = peak.amplitude / (1000.0 * 0.01 * TAU * 50.0);
        assert!(
            (selected.field.magnitude() - expected_b).abs() / expected_b < 5e-3,
            "field magnitude {} vs {}",
            selected.field.magnitude(),
            expected_b
        );
    }

    #[test]
    fn masked_phase_spectrum_is_zero_off_peak() {
        let output = analyze_frame(&spinning_frame(1200, 1.0)).expect("frame");
        let peak_bins: Vec<usize> = output
            .phases_masked_deg
            .values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(peak_bins.len(), 1);
        // Values are degrees in [0, 360).
        let deg = output.phases_masked_deg.values[peak_bins[0]];
        assert!((0.0..360.0 + 1e-9).contains(&deg));
    }

    #[test]
    fn stationary_rotor_aborts_the_frame() {
        let mut frame = spinning_frame(1200, 1.0);
        frame.angles = vec![1.0; 1200];
        let err = analyze_frame(&frame).unwrap_err();
        assert_eq!(err, ProcessingError::DegenerateFrequency);
    }

    #[test]
    fn silent_input_emits_empty_peak_list() {
        let frame = FrameSnapshot {
            samples: vec![0.0; 256],
            angles: vec![0.0; 256],
            config: test_config(256, WindowKind::Rectangular),
        };
        let output = analyze_frame(&frame).expect("frame");
        assert!(output.peaks.is_empty());
        assert!(output.selected.is_none());
        assert!(output.phases_masked_deg.values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn selection_prefers_rotor_frequency_over_stronger_harmonic() {
        // Fundamental at 20 Hz (weak) plus a louder 40 Hz harmonic; the rotor
        // spins at 20 Hz, so the selection must pick the 20 Hz peak.
        let sample_rate = 1200.0;
        let nsig = 1200;
        let samples: Vec<f64> = (0..nsig)
            .map(|i| {
                let t = i as f64 / sample_rate;
                0.5 * (TAU * 20.0 * t).sin() + 2.0 * (TAU * 40.0 * t).sin()
            })
            .collect();
        let angles: Vec<f64> = (0..nsig)
            .map(|i| (TAU * 20.0 * i as f64 / sample_rate).rem_euclid(TAU))
            .collect();
        let frame = FrameSnapshot {
            samples,
            angles,
            config: test_config(nsig, WindowKind::Hann),
        };

        let output = analyze_frame(&frame).expect("frame");
        assert!(output.peaks.len() >= 2, "both tones should be detected");
        let selected = output.selected.expect("selected");
        assert!(
            (selected.freq - 20.0).abs() <= 1.0,
            "selected {} Hz, expected the 20 Hz rotation",
            selected.freq
        );
    }

    #[test]
    fn ingest_reports_frame_readiness() {
        let mut state = EngineState::new(test_config(8, WindowKind::Rectangular));
        assert!(!state.ingest(&[0.0; 4]));
        assert!(state.ingest(&[0.0; 4]));
    }

    #[test]
    fn non_rolling_frame_drains_buffers() {
        let mut state = EngineState::new(test_config(4, WindowKind::Rectangular));
        state.ingest(&[1.0, 2.0, 3.0, 4.0]);
        let snap = state.take_frame();
        assert_eq!(snap.samples, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(snap.angles.len(), 4);
        assert!(state.samples.is_empty());
        assert!(state.angles.is_empty());
    }

    #[test]
    fn rolling_frame_keeps_buffers() {
        let mut config = test_config(4, WindowKind::Rectangular);
        config.rolling_fft = true;
        let mut state = EngineState::new(config);
        state.ingest(&[1.0, 2.0, 3.0, 4.0]);
        let _ = state.take_frame();
        assert_eq!(state.samples.len(), 4);
    }

    #[test]
    fn interpolated_angles_follow_motor_readings() {
        let mut state = EngineState::new(test_config(8, WindowKind::Rectangular));
        state.record_motor(MotorReading { theta: 0.0, freq: 1.0 });
        state.record_motor(MotorReading { theta: 1.0, freq: 1.0 });
        state.ingest(&[0.0; 5]);

        let angles = state.angles.snapshot();
        assert_eq!(angles.len(), 5);
        assert!((angles[0] - 0.0).abs() < 1e-12);
        assert!((angles[4] - 1.0).abs() < 1e-12);
        assert!((angles[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn concurrent_resize_never_overflows_new_capacity() {
        // A shrinking resize racing a stream of appends must never leave the
        // buffer longer than its capacity, and must never panic.
        let state = Arc::new(Mutex::new(EngineState::new(test_config(
            4096,
            WindowKind::Rectangular,
        ))));

        let writer = {
            let state = Arc::clone(&state);
            std::thread::spawn(move || {
                for _ in 0..2000 {
                    let mut s = lock(&state);
                    s.ingest(&[0.25; 16]);
                    let len = s.samples.len();
                    let cap = s.samples.capacity();
                    assert!(len <= cap, "buffer length {len} exceeded capacity {cap}");
                }
            })
        };
        let resizer = {
            let state = Arc::clone(&state);
            std::thread::spawn(move || {
                for i in 0..200 {
                    let next_nsig = if i % 2 == 0 { 64 } else { 4096 };
                    let mut s = lock(&state);
                    let mut next = s.config.clone();
                    next.nsig = next_nsig;
                    next.ntot = 4096;
                    s.commit_config(next);
                }
            })
        };

        writer.join().expect("writer thread");
        resizer.join().expect("resizer thread");

        let s = lock(&state);
        assert!(s.samples.len() <= s.samples.capacity());
        assert_eq!(s.samples.capacity(), s.angles.capacity());
    }
}
