//! Wind shelter index: per-window quantile of shelter angles.
//!
//! For each valid window the sector mask selects the upwind cells, missing
//! cells are dropped, and every remaining cell contributes
//! `atan((z - z_centre) / distance)`. The window collapses to the requested
//! quantile of those angles (linear interpolation between order statistics).
//! Windows with no usable cell yield NaN.
//!
//! The pass over windows is data-parallel across output rows with Rayon.
//! Border cells without a full window are filled with a constant.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use ndarray::{s, Array2, ArrayView2, ArrayViewMut1, Axis, Zip};
use ndarray_stats::interpolate::Linear;
use ndarray_stats::Quantile1dExt;
use noisy_float::types::{n64, N64};
use rayon::prelude::*;

use crate::error::{Result, ShelterError};
use crate::mask::{build_mask, SectorMask};
use crate::params::{validate_prob, MissingPolicy, ShelterParams};
use crate::window::WindowGrid;

/// Value written to border cells that have no full window.
pub const BORDER_FILL: f64 = 0.0;

/// Shelter reduction bound to one sector mask and parameter set.
pub struct ShelterKernel<'m> {
    sector: &'m SectorMask,
    nodata: Option<f64>,
    prob: N64,
    missing: MissingPolicy,
}

impl<'m> ShelterKernel<'m> {
    pub fn new(
        sector: &'m SectorMask,
        nodata: Option<f64>,
        prob: f64,
        missing: MissingPolicy,
    ) -> Result<Self> {
        validate_prob(prob)?;
        Ok(Self {
            sector,
            nodata,
            prob: n64(prob),
            missing,
        })
    }

    /// Scratch buffer large enough for any window of this kernel.
    pub fn scratch(&self) -> Vec<N64> {
        Vec::with_capacity(self.sector.included_count())
    }

    /// Shelter value of one window, or NaN when nothing usable remains.
    pub fn reduce(&self, window: ArrayView2<f64>) -> f64 {
        let mut scratch = self.scratch();
        self.reduce_with(window, &mut scratch)
    }

    /// Same as [`reduce`](Self::reduce), reusing `scratch` between windows.
    pub fn reduce_with(&self, window: ArrayView2<f64>, scratch: &mut Vec<N64>) -> f64 {
        let r = self.sector.radius();
        debug_assert_eq!(window.dim(), (self.sector.side(), self.sector.side()));

        let centre = window[[r, r]];
        if self.missing.is_missing(centre, self.nodata) || !centre.is_finite() {
            return f64::NAN;
        }

        scratch.clear();
        Zip::indexed(window)
            .and(self.sector.mask())
            .and(self.sector.distance())
            .for_each(|(i, j), &z, &inside, &dist| {
                if !inside || (i == r && j == r) {
                    return;
                }
                if self.missing.is_missing(z, self.nodata) || !z.is_finite() {
                    return;
                }
                scratch.push(n64(((z - centre) / dist).atan()));
            });

        // Empty input is the only possible error once prob is validated
        ArrayViewMut1::from(scratch.as_mut_slice())
            .quantile_mut(self.prob, &Linear)
            .map_or(f64::NAN, |q| q.raw())
    }
}

/// Shelter values for every valid centre, shaped `(n_rows-2r, n_cols-2r)`.
///
/// Rows are processed in parallel. `progress` counts completed output rows;
/// setting `cancel` stops remaining rows and returns `Cancelled`.
pub fn compute_interior(
    grid: ArrayView2<f64>,
    nodata: Option<f64>,
    params: &ShelterParams,
    progress: Option<Arc<AtomicUsize>>,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<Array2<f64>> {
    params.validate()?;
    let windows = WindowGrid::new(grid, params.radius)?;
    let sector = build_mask(
        params.radius,
        params.direction,
        params.tolerance,
        params.cell_size,
    )?;
    let kernel = ShelterKernel::new(&sector, nodata, params.prob, params.missing)?;

    let (rows, cols) = windows.shape();
    info!(
        "Wind shelter: {}x{} valid centres, radius={}, direction={}, tolerance={}, prob={}",
        rows, cols, params.radius, params.direction, params.tolerance, params.prob
    );

    if let Some(ref counter) = progress {
        counter.store(0, Ordering::Relaxed);
    }

    let mut interior = Array2::<f64>::from_elem((rows, cols), f64::NAN);
    let cancel_ref = &cancel;
    let progress_ref = &progress;

    interior
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut out_row)| {
            if let Some(ref flag) = cancel_ref {
                if flag.load(Ordering::Relaxed) {
                    return;
                }
            }

            let mut scratch = kernel.scratch();
            for (j, out) in out_row.iter_mut().enumerate() {
                *out = kernel.reduce_with(windows.get(i, j), &mut scratch);
            }

            if let Some(ref counter) = progress_ref {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });

    if let Some(ref flag) = cancel {
        if flag.load(Ordering::Relaxed) {
            return Err(ShelterError::Cancelled);
        }
    }

    let missing = count_missing(interior.view());
    if missing > 0 {
        warn!("{} of {} windows have no usable value", missing, rows * cols);
    } else {
        debug!("All {} windows have a usable value", rows * cols);
    }

    Ok(interior)
}

/// Number of NaN cells in a computed grid.
pub fn count_missing(values: ArrayView2<f64>) -> usize {
    values.iter().filter(|v| v.is_nan()).count()
}

/// Pad `interior` by `radius` cells on every side with `value`.
pub fn pad_border(interior: ArrayView2<f64>, radius: usize, value: f64) -> Array2<f64> {
    let (rows, cols) = interior.dim();
    let mut padded = Array2::from_elem((rows + 2 * radius, cols + 2 * radius), value);
    padded
        .slice_mut(s![radius..radius + rows, radius..radius + cols])
        .assign(&interior);
    padded
}

/// Full wind shelter grid with the same shape as `grid`.
///
/// Border cells are [`BORDER_FILL`]; interior cells whose window had no
/// usable data are NaN.
pub fn windshelter(
    grid: ArrayView2<f64>,
    nodata: Option<f64>,
    params: &ShelterParams,
) -> Result<Array2<f64>> {
    let interior = compute_interior(grid, nodata, params, None, None)?;
    Ok(pad_border(interior.view(), params.radius, BORDER_FILL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array2};

    const ND: f64 = -9999.0;

    fn full_circle(radius: usize) -> SectorMask {
        build_mask(radius, 0.0, 360.0, 1.0).unwrap()
    }

    #[test]
    fn test_flat_window_is_zero() {
        let sector = full_circle(1);
        let kernel = ShelterKernel::new(&sector, Some(ND), 0.5, MissingPolicy::NodataAndZero).unwrap();
        let window = Array2::from_elem((3, 3), 100.0);
        assert_eq!(kernel.reduce(window.view()), 0.0);
    }

    #[test]
    fn test_median_of_four_neighbours() {
        // Radius 1 full circle keeps the four edge neighbours
        let sector = full_circle(1);
        let kernel = ShelterKernel::new(&sector, Some(ND), 0.5, MissingPolicy::NodataAndZero).unwrap();
        let window = arr2(&[[50.0, 11.0, 50.0], [12.0, 10.0, 13.0], [50.0, 14.0, 50.0]]);
        // angles atan(1), atan(2), atan(3), atan(4); median between atan(2) and atan(3)
        let expected = (2.0_f64.atan() + 3.0_f64.atan()) / 2.0;
        assert!((kernel.reduce(window.view()) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_extremes() {
        let sector = full_circle(1);
        let window = arr2(&[[0.0, 11.0, 0.0], [12.0, 10.0, 13.0], [0.0, 14.0, 0.0]]);
        let lo = ShelterKernel::new(&sector, None, 0.0, MissingPolicy::NodataAndZero).unwrap();
        let hi = ShelterKernel::new(&sector, None, 1.0, MissingPolicy::NodataAndZero).unwrap();
        assert!((lo.reduce(window.view()) - 1.0_f64.atan()).abs() < 1e-12);
        assert!((hi.reduce(window.view()) - 4.0_f64.atan()).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_monotonic_in_prob() {
        let sector = build_mask(3, 30.0, 200.0, 5.0).unwrap();
        let window = Array2::from_shape_fn((7, 7), |(i, j)| 100.0 + ((i * 7 + j) as f64 * 1.7).sin() * 20.0);
        let mut last = f64::NEG_INFINITY;
        for step in 0..=20 {
            let prob = step as f64 / 20.0;
            let kernel = ShelterKernel::new(&sector, Some(ND), prob, MissingPolicy::NodataAndZero).unwrap();
            let value = kernel.reduce(window.view());
            assert!(value >= last, "prob={prob}: {value} < {last}");
            last = value;
        }
    }

    #[test]
    fn test_all_nodata_is_missing() {
        let sector = full_circle(2);
        let kernel = ShelterKernel::new(&sector, Some(ND), 0.5, MissingPolicy::NodataAndZero).unwrap();
        let mut window = Array2::from_elem((5, 5), ND);
        window[[2, 2]] = 100.0;
        assert!(kernel.reduce(window.view()).is_nan());
    }

    #[test]
    fn test_missing_centre_is_missing() {
        let sector = full_circle(1);
        let kernel = ShelterKernel::new(&sector, Some(ND), 0.5, MissingPolicy::NodataOnly).unwrap();
        let mut window = Array2::from_elem((3, 3), 100.0);
        window[[1, 1]] = ND;
        assert!(kernel.reduce(window.view()).is_nan());
    }

    #[test]
    fn test_zero_elevation_policy() {
        let sector = full_circle(1);
        let window = arr2(&[[5.0, 0.0, 5.0], [0.0, 1.0, 0.0], [5.0, 3.0, 5.0]]);
        let merged = ShelterKernel::new(&sector, Some(ND), 0.5, MissingPolicy::NodataAndZero).unwrap();
        let strict = ShelterKernel::new(&sector, Some(ND), 0.5, MissingPolicy::NodataOnly).unwrap();
        // Only the cell at 3 survives when zeros are dropped
        assert!((merged.reduce(window.view()) - 2.0_f64.atan()).abs() < 1e-12);
        // Zeros count: angles atan(-1) x3 and atan(2); median is atan(-1)
        assert!((strict.reduce(window.view()) - (-1.0_f64).atan()).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_sector_cells_ignored() {
        // Sector covering increasing rows only (90 degrees +- a bit)
        let sector = build_mask(1, 80.0, 20.0, 1.0).unwrap();
        let kernel = ShelterKernel::new(&sector, None, 0.5, MissingPolicy::NodataOnly).unwrap();
        let window = arr2(&[[900.0, 900.0, 900.0], [900.0, 10.0, 900.0], [900.0, 20.0, 900.0]]);
        assert!((kernel.reduce(window.view()) - 10.0_f64.atan()).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_prob_rejected_up_front() {
        let sector = full_circle(1);
        assert!(ShelterKernel::new(&sector, None, 1.01, MissingPolicy::NodataOnly).is_err());
        let grid = Array2::from_elem((5, 5), 1.0);
        let params = ShelterParams { radius: 1, prob: -0.5, ..Default::default() };
        assert!(windshelter(grid.view(), None, &params).is_err());
    }

    #[test]
    fn test_pad_border() {
        let interior = arr2(&[[1.0, 2.0], [3.0, f64::NAN]]);
        let padded = pad_border(interior.view(), 2, 0.0);
        assert_eq!(padded.dim(), (6, 6));
        assert_eq!(padded[[2, 2]], 1.0);
        assert_eq!(padded[[3, 2]], 3.0);
        assert!(padded[[3, 3]].is_nan());
        assert_eq!(padded.row(0).sum(), 0.0);
        assert_eq!(padded.column(5).sum(), 0.0);
    }

    #[test]
    fn test_cancel_before_start() {
        let grid = Array2::from_elem((20, 20), 10.0);
        let params = ShelterParams { radius: 2, cell_size: 1.0, ..Default::default() };
        let cancel = Arc::new(AtomicBool::new(true));
        let result = compute_interior(grid.view(), None, &params, None, Some(cancel));
        assert!(matches!(result, Err(ShelterError::Cancelled)));
    }

    #[test]
    fn test_progress_counts_rows() {
        let grid = Array2::from_shape_fn((12, 9), |(i, j)| (i + j) as f64 + 1.0);
        let params = ShelterParams { radius: 2, cell_size: 1.0, ..Default::default() };
        let progress = Arc::new(AtomicUsize::new(0));
        let interior =
            compute_interior(grid.view(), None, &params, Some(progress.clone()), None).unwrap();
        assert_eq!(interior.dim(), (8, 5));
        assert_eq!(progress.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn test_count_missing_after_pass() {
        let mut grid = Array2::from_elem((7, 7), 50.0);
        grid[[3, 3]] = ND;
        let params = ShelterParams { radius: 1, cell_size: 1.0, ..Default::default() };
        let interior = compute_interior(grid.view(), Some(ND), &params, None, None).unwrap();
        // Only the window centred on the nodata cell is missing
        assert_eq!(count_missing(interior.view()), 1);
        assert!(interior[[2, 2]].is_nan());

        let clean = Array2::from_elem((7, 7), 50.0);
        let interior = compute_interior(clean.view(), Some(ND), &params, None, None).unwrap();
        assert_eq!(count_missing(interior.view()), 0);
    }
}
