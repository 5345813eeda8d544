//! Run parameters for the wind shelter index.
//!
//! One `ShelterParams` describes a single direction/radius/quantile
//! combination. Validation happens once, before any window is touched.

use crate::error::{Result, ShelterError};

/// Which cell values count as "no elevation data" inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// The nodata sentinel and an exact elevation of `0` are both missing.
    /// Reproduces the reference windshelter output.
    #[default]
    NodataAndZero,
    /// Only the nodata sentinel (and NaN) is missing; `0` is a real elevation.
    NodataOnly,
}

impl MissingPolicy {
    /// True when `value` must be dropped from the statistic.
    #[inline]
    pub fn is_missing(self, value: f64, nodata: Option<f64>) -> bool {
        if value.is_nan() {
            return true;
        }
        if nodata == Some(value) {
            return true;
        }
        matches!(self, MissingPolicy::NodataAndZero) && value == 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShelterParams {
    /// Window half-size in cells.
    pub radius: usize,
    /// Sector start in degrees, clockwise.
    pub direction: f64,
    /// Sector angular width in degrees.
    pub tolerance: f64,
    /// Quantile of the local shelter angles, in `[0, 1]`.
    pub prob: f64,
    /// Ground distance per grid step.
    pub cell_size: f64,
    pub missing: MissingPolicy,
}

impl Default for ShelterParams {
    fn default() -> Self {
        Self {
            radius: 8,
            direction: 180.0,
            tolerance: 45.0,
            prob: 0.5,
            cell_size: 10.0,
            missing: MissingPolicy::NodataAndZero,
        }
    }
}

impl ShelterParams {
    /// Side length of the square window, `2 * radius + 1`.
    pub fn window_side(&self) -> usize {
        2 * self.radius + 1
    }

    pub fn validate(&self) -> Result<()> {
        validate_radius(self.radius)?;
        validate_cell_size(self.cell_size)?;
        validate_direction(self.direction)?;
        validate_tolerance(self.tolerance)?;
        validate_prob(self.prob)?;
        Ok(())
    }
}

pub(crate) fn validate_radius(radius: usize) -> Result<()> {
    if radius < 1 {
        return Err(ShelterError::invalid("radius", radius, "must be at least 1"));
    }
    Ok(())
}

pub(crate) fn validate_cell_size(cell_size: f64) -> Result<()> {
    if !cell_size.is_finite() || cell_size <= 0.0 {
        return Err(ShelterError::invalid(
            "cell_size",
            cell_size,
            "must be a positive finite number",
        ));
    }
    Ok(())
}

pub(crate) fn validate_direction(direction: f64) -> Result<()> {
    if !(0.0..360.0).contains(&direction) {
        return Err(ShelterError::invalid(
            "direction",
            direction,
            "must be in [0, 360)",
        ));
    }
    Ok(())
}

// 360 is accepted and means the full circle.
pub(crate) fn validate_tolerance(tolerance: f64) -> Result<()> {
    if !(0.0..=360.0).contains(&tolerance) {
        return Err(ShelterError::invalid(
            "tolerance",
            tolerance,
            "must be in [0, 360]",
        ));
    }
    Ok(())
}

pub(crate) fn validate_prob(prob: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&prob) {
        return Err(ShelterError::invalid("prob", prob, "must be in [0, 1]"));
    }
    Ok(())
}
