//! Synthetic rotor.
//!
//! Steps the rotor angle the way the stepper driver does: a fixed angular
//! increment per step at a rate of `steps_per_rev * |freq|`, publishing the
//! wrapped angle and commanded frequency on every step.

use std::f64::consts::TAU;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::AcquisitionError;
use crate::bus::{Message, MessageBus};
use crate::types::MotorReading;

/// Virtual stepper motor spinning the sense coil.
pub struct VirtualMotor {
    bus: MessageBus,
    /// Rotation frequency (Hz), signed by direction
    freq: f64,
    steps_per_rev: u32,
    theta: f64,
}

impl VirtualMotor {
    /// A zero frequency cannot be stepped (the step delay would be infinite),
    /// so it is rejected up front.
    pub fn new(bus: MessageBus, freq: f64, steps_per_rev: u32) -> Result<Self, AcquisitionError> {
        if freq == 0.0 || !freq.is_finite() {
            return Err(AcquisitionError::InvalidParameter(format!(
                "motor frequency ({freq}) must be non-zero and finite"
            )));
        }
        if steps_per_rev == 0 {
            return Err(AcquisitionError::InvalidParameter(
                "steps_per_rev must be > 0".to_string(),
            ));
        }
        Ok(Self {
            bus,
            freq,
            steps_per_rev,
            theta: 0.0,
        })
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!(freq = self.freq, "starting virtual motor");

        let delay = Duration::from_secs_f64(1.0 / (self.steps_per_rev as f64 * self.freq.abs()));
        let delta_theta = self.freq.signum() * TAU / self.steps_per_rev as f64;
        let mut ticker = tokio::time::interval(delay);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[Motor] shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    self.theta = (self.theta + delta_theta).rem_euclid(TAU);
                    self.bus.publish(Message::MotorData(MotorReading {
                        theta: self.theta,
                        freq: self.freq,
                    }));
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
