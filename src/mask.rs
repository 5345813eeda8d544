//! Sector mask and distance grid for the wind shelter window.
//!
//! Both arrays are `(2r+1) x (2r+1)` and centred on `(r, r)`. They depend
//! only on the radius, the sector and the cell size, so they are built once
//! per run and shared read-only by every window.
//!
//! Angles follow the grid axes: the polar angle of an offset is
//! `atan2(row_offset, col_offset)`, so 0 points along increasing columns and
//! angles grow clockwise on a north-up raster.

use std::f64::consts::TAU;

use log::debug;
use ndarray::Array2;

use crate::error::Result;
use crate::params::{validate_cell_size, validate_direction, validate_radius, validate_tolerance};

#[derive(Debug, Clone)]
pub struct SectorMask {
    radius: usize,
    distance: Array2<f64>,
    mask: Array2<bool>,
}

impl SectorMask {
    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn side(&self) -> usize {
        2 * self.radius + 1
    }

    /// Ground distance from each offset to the centre, scaled by cell size.
    pub fn distance(&self) -> &Array2<f64> {
        &self.distance
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    /// Number of in-sector cells, not counting the centre.
    pub fn included_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count() - 1
    }

    pub fn into_parts(self) -> (Array2<f64>, Array2<bool>) {
        (self.distance, self.mask)
    }
}

/// Slack on both sector edges so offsets lying exactly on an edge are
/// included regardless of rounding.
const EDGE_EPS: f64 = 1e-12;

/// Start angle and angular span of a sector, in radians.
///
/// A stop angle that wraps past 0° gets a full turn added; a tolerance of
/// 360° is the whole circle.
fn sector_span(direction: f64, tolerance: f64) -> (f64, f64) {
    let start = direction.to_radians();
    let mut stop = (direction + tolerance).rem_euclid(360.0).to_radians();
    if stop < start || tolerance >= 360.0 {
        stop += TAU;
    }
    (start, stop - start)
}

/// Build the distance grid and the boolean sector mask.
///
/// A cell is in the sector when its unscaled distance to the centre is at
/// most `radius` and its angle relative to `direction` is within the span.
/// The centre is always marked as included; the reducer drops it anyway.
pub fn build_mask(
    radius: usize,
    direction: f64,
    tolerance: f64,
    cell_size: f64,
) -> Result<SectorMask> {
    validate_radius(radius)?;
    validate_cell_size(cell_size)?;
    validate_direction(direction)?;
    validate_tolerance(tolerance)?;

    let side = 2 * radius + 1;
    let r = radius as isize;
    let (start, span) = sector_span(direction, tolerance);

    let distance = Array2::from_shape_fn((side, side), |(i, j)| {
        let dr = (i as isize - r) as f64;
        let dc = (j as isize - r) as f64;
        (dr * dr + dc * dc).sqrt() * cell_size
    });

    let mask = Array2::from_shape_fn((side, side), |(i, j)| {
        let dr = i as isize - r;
        let dc = j as isize - r;
        if dr == 0 && dc == 0 {
            return true;
        }
        if dr * dr + dc * dc > r * r {
            return false;
        }
        let mut theta = ((dr as f64).atan2(dc as f64) - start).rem_euclid(TAU);
        // Just below a full turn is the start edge
        if theta > TAU - EDGE_EPS {
            theta = 0.0;
        }
        theta <= span + EDGE_EPS
    });

    let sector = SectorMask {
        radius,
        distance,
        mask,
    };

    debug!(
        "Sector mask: radius={}, direction={}, tolerance={}, cell_size={} -> {} cells in sector",
        radius,
        direction,
        tolerance,
        cell_size,
        sector.included_count()
    );

    Ok(sector)
}
