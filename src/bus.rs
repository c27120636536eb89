//! Topic-tagged message bus connecting acquisition, calculation, and any
//! transport front ends.
//!
//! The original deployment routed dict-shaped messages through a shared queue
//! keyed by topic strings. Here each topic is a variant of [`Message`], so a
//! malformed payload cannot exist past the transport boundary; the topic
//! string is retained for logging and for wire adapters.

use tokio::sync::broadcast;
use tracing::trace;

use crate::types::{
    AdcStatus, CalculationStatus, FieldVector, MotorReading, Peak, SpectrumFrame,
};

/// Default bus depth. Slow subscribers past this lag start dropping messages
/// (broadcast semantics); the engine treats a lagged receiver as non-fatal.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

// ============================================================================
// Messages
// ============================================================================

/// One published message; each variant corresponds to one topic.
#[derive(Debug, Clone)]
pub enum Message {
    /// `voltage/data` - batch of raw coil voltage samples (V)
    VoltageData(Vec<f64>),
    /// `motor/data` - latest rotor angle and rotation frequency
    MotorData(MotorReading),
    /// `adc/status` - acquisition front-end announcement
    AdcStatus(AdcStatus),
    /// `calculation/command` - partial reconfiguration payload (JSON)
    CalculationCommand(serde_json::Value),
    /// `fft_mags/data` - full single-sided magnitude spectrum (V)
    FftMagnitudes(SpectrumFrame),
    /// `fft_phases/data` - phase spectrum in degrees, zeroed at non-peak bins
    FftPhases(SpectrumFrame),
    /// `signals/data` - all detected peaks for the frame
    Signals(Vec<Peak>),
    /// `signal/data` - the peak selected as the physical rotation signal
    SignalOfInterest(Box<Peak>),
    /// `bfield/data` - field vector of the selected signal
    FieldVector(FieldVector),
    /// `calculation/status` - engine configuration snapshot
    CalculationStatus(CalculationStatus),
}

impl Message {
    /// Wire topic string for this message.
    pub fn topic(&self) -> &'static str {
        match self {
            Message::VoltageData(_) => "voltage/data",
            Message::MotorData(_) => "motor/data",
            Message::AdcStatus(_) => "adc/status",
            Message::CalculationCommand(_) => "calculation/command",
            Message::FftMagnitudes(_) => "fft_mags/data",
            Message::FftPhases(_) => "fft_phases/data",
            Message::Signals(_) => "signals/data",
            Message::SignalOfInterest(_) => "signal/data",
            Message::FieldVector(_) => "bfield/data",
            Message::CalculationStatus(_) => "calculation/status",
        }
    }
}

// ============================================================================
// Bus
// ============================================================================

/// Cloneable handle to the shared broadcast bus.
///
/// Publishing never blocks and never fails: with no subscribers the message is
/// dropped, which is the correct behaviour during startup and teardown.
#[derive(Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<Message>,
}

impl MessageBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a message to all current subscribers.
    pub fn publish(&self, message: Message) {
        trace!(topic = message.topic(), "publish");
        // A send error only means there are no receivers right now.
        let _ = self.tx.send(message);
    }

    /// Open a new subscription; receives messages published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.tx.subscribe()
    }

    /// Number of live subscribers (diagnostics only).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

// ============================================================================
// Tests
// ============================================================================
