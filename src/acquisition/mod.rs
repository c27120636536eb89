//! Signal acquisition front ends.
//!
//! The engine only consumes bus topics, so acquisition is a thin layer: a
//! [`SignalSource`] produces voltage batches, and [`AdcComponent`] pumps any
//! source onto the bus. Hardware ADCs slot in behind the same trait; the
//! virtual implementations below stand in for them on a bench without
//! hardware.

mod virtual_adc;
mod virtual_motor;

pub use virtual_adc::VirtualCoil;
pub use virtual_motor::VirtualMotor;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bus::{Message, MessageBus};
use crate::types::AdcStatus;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("acquisition source failed: {0}")]
    SourceFailed(String),

    #[error("invalid source parameter: {0}")]
    InvalidParameter(String),
}

// ============================================================================
// Source Trait
// ============================================================================

/// Something that produces batches of coil-voltage samples.
///
/// Implementations handle their own pacing: `next_batch` resolves when the
/// next batch worth of samples is available.
#[async_trait]
pub trait SignalSource: Send + 'static {
    /// Produce the next batch of voltage samples (V).
    async fn next_batch(&mut self) -> Result<Vec<f64>, AcquisitionError>;

    /// Effective sampling rate (Hz).
    fn sample_rate(&self) -> f64;

    /// Samples per batch.
    fn batch_len(&self) -> usize;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

// ============================================================================
// ADC Component
// ============================================================================

/// Pumps a [`SignalSource`] onto the bus.
///
/// Announces the source on `adc/status`, then publishes every batch on
/// `voltage/data` until cancellation or a source failure.
pub struct AdcComponent<S: SignalSource> {
    bus: MessageBus,
    source: S,
}

impl<S: SignalSource> AdcComponent<S> {
    pub fn new(bus: MessageBus, source: S) -> Self {
        Self { bus, source }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!(source = self.source.source_name(), "starting acquisition");
        self.bus.publish(Message::AdcStatus(AdcStatus {
            sample_rate: self.source.sample_rate(),
            nbuf: self.source.batch_len(),
        }));

        loop {
            let batch = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[Acquisition] shutdown signal received");
                    break;
                }
                result = self.source.next_batch() => match result {
                    Ok(batch) => batch,
                    Err(e) => {
                        warn!(error = %e, "acquisition source error, stopping");
                        break;
                    }
                },
            };
            self.bus.publish(Message::VoltageData(batch));
        }
    }
}
