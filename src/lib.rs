//! Rotoflux: rotating-coil magnetometer engine.
//!
//! Continuously digitizes the voltage induced in a spinning sense coil,
//! estimates its spectral content, detects genuine peaks against an adaptive
//! noise floor, and converts the rotation-locked peak into a magnetic-field
//! vector referenced to the instantaneous rotor angle.
//!
//! ## Architecture
//!
//! - **Bus**: typed topic messages over a broadcast channel
//! - **Acquisition**: voltage batches and rotor angles (virtual or hardware)
//! - **Processing**: pure numeric pipeline (window, FFT, peaks, amplitude,
//!   phase reference, Faraday inversion)
//! - **Calculation**: buffering, frame snapshots, worker offload, runtime
//!   reconfiguration

pub mod acquisition;
pub mod bus;
pub mod calculation;
pub mod config;
pub mod processing;
pub mod types;

// Re-export the messaging surface
pub use bus::{Message, MessageBus};

// Re-export commonly used types
pub use types::{
    AdcStatus, CalculationStatus, CoilGeometry, FieldVector, MotorReading, Peak, SpectrumFrame,
};

// Re-export the engine
pub use calculation::{CalculationCommand, CalculationComponent, CalculationConfig, EngineError};

// Re-export configuration
pub use config::{Settings, SettingsError};

// Re-export the numeric pipeline surface
pub use processing::{ProcessingError, WindowKind};
