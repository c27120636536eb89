//! Faraday inversion: induced voltage amplitude to magnetic field vector.
//!
//! A coil of `N` windings and area `A` spinning at angular rate `omega` in a
//! uniform transverse field `B` sees a peak induced voltage `V = N A omega B`.
//! Inverting that gives the field magnitude; the rotor reference angle fixes
//! its direction in the lab frame.

use super::ProcessingError;
use crate::types::{CoilGeometry, FieldVector};

/// Convert a peak voltage amplitude into a 2D field vector.
///
/// # Arguments
/// * `amplitude_volts` - estimated voltage amplitude of the tone
/// * `omega_rad_s` - angular frequency of the rotation (rad/s, signed)
/// * `theta_rad` - reference angle aligning the measurement to the lab frame
/// * `coil` - sense-coil geometry
///
/// A zero `omega_rad_s` would divide by zero; it is rejected with
/// `DegenerateFrequency` before any arithmetic.
pub fn to_field(
    amplitude_volts: f64,
    omega_rad_s: f64,
    theta_rad: f64,
    coil: &CoilGeometry,
) -> Result<FieldVector, ProcessingError> {
    if omega_rad_s == 0.0 {
        return Err(ProcessingError::DegenerateFrequency);
    }

    let magnitude = amplitude_volts / (coil.windings * coil.area_m2 * omega_rad_s);
    Ok(FieldVector {
        bx: magnitude * -theta_rad.cos(),
        by: magnitude * theta_rad.sin(),
    })
}

// ============================================================================
// Tests
// ============================================================================
