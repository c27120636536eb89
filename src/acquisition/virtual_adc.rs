//! Synthetic coil-voltage source.
//!
//! Generates a sum of configured tones plus a DC offset, with gaussian noise
//! scaled to a fraction of the clean batch's standard deviation. Batches are
//! paced at the nominal sampling rate, so the downstream pipeline sees
//! realistic timing.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::TAU;
use std::time::Duration;

use super::{AcquisitionError, SignalSource};

/// Virtual sense coil with configurable tones and noise.
pub struct VirtualCoil {
    /// (frequency Hz, amplitude V) per tone
    tones: Vec<(f64, f64)>,
    /// Running phase per tone (rad)
    phases: Vec<f64>,
    sample_rate: f64,
    nbuf: usize,
    noise_level: f64,
    dc_offset: f64,
    rng: StdRng,
}

impl VirtualCoil {
    pub fn new(
        tones: Vec<(f64, f64)>,
        sample_rate: f64,
        nbuf: usize,
        noise_level: f64,
        dc_offset: f64,
    ) -> Result<Self, AcquisitionError> {
        if sample_rate <= 0.0 {
            return Err(AcquisitionError::InvalidParameter(format!(
                "sample_rate ({sample_rate}) must be > 0"
            )));
        }
        if nbuf == 0 {
            return Err(AcquisitionError::InvalidParameter(
                "nbuf must be > 0".to_string(),
            ));
        }
        if noise_level < 0.0 {
            return Err(AcquisitionError::InvalidParameter(format!(
                "noise_level ({noise_level}) must be >= 0"
            )));
        }
        let phases = vec![0.0; tones.len()];
        Ok(Self {
            tones,
            phases,
            sample_rate,
            nbuf,
            noise_level,
            dc_offset,
            rng: StdRng::from_entropy(),
        })
    }

    /// Generate one clean batch by advancing each tone's phase accumulator.
    fn generate_clean(&mut self) -> Vec<f64> {
        let dt = 1.0 / self.sample_rate;
        (0..self.nbuf)
            .map(|_| {
                let mut value = self.dc_offset;
                for ((freq, amplitude), phase) in self.tones.iter().zip(self.phases.iter_mut()) {
                    *phase = (*phase + TAU * freq * dt).rem_euclid(TAU);
                    value += amplitude * phase.sin();
                }
                value
            })
            .collect()
    }

    /// Add gaussian noise scaled by the batch's standard deviation.
    fn add_noise(&mut self, mut batch: Vec<f64>) -> Vec<f64> {
        if self.noise_level == 0.0 || batch.is_empty() {
            return batch;
        }
        let mean = batch.iter().sum::<f64>() / batch.len() as f64;
        let variance =
            batch.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / batch.len() as f64;
        let sigma = self.noise_level * variance.sqrt();
        if sigma > 0.0 {
            // Normal::new only fails on a non-finite sigma.
            if let Ok(noise) = Normal::new(0.0, sigma) {
                for v in &mut batch {
                    *v += noise.sample(&mut self.rng);
                }
            }
        }
        batch
    }
}

#[async_trait]
impl SignalSource for VirtualCoil {
    async fn next_batch(&mut self) -> Result<Vec<f64>, AcquisitionError> {
        // Pace one batch worth of real time.
        let batch_seconds = self.nbuf as f64 / self.sample_rate;
        tokio::time::sleep(Duration::from_secs_f64(batch_seconds)).await;

        let clean = self.generate_clean();
        Ok(self.add_noise(clean))
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn batch_len(&self) -> usize {
        self.nbuf
    }

    fn source_name(&self) -> &str {
        "virtual-coil"
    }
}

// ============================================================================
// Tests
// ============================================================================
