//! PyO3 bindings. Raster I/O stays on the Python side (rasterio); these
//! functions take and return plain numpy grids.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::{PyIOError, PyInterruptedError, PyValueError};
use pyo3::prelude::*;

use crate::error::ShelterError;
use crate::mask::build_mask;
use crate::params::{MissingPolicy, ShelterParams};
use crate::shelter::{compute_interior, pad_border, BORDER_FILL};

impl From<ShelterError> for PyErr {
    fn from(err: ShelterError) -> PyErr {
        match err {
            ShelterError::InvalidParameter { .. } | ShelterError::InputTooSmall { .. } => {
                PyValueError::new_err(err.to_string())
            }
            ShelterError::Cancelled => PyInterruptedError::new_err(err.to_string()),
            _ => PyIOError::new_err(err.to_string()),
        }
    }
}

fn params_from_args(
    radius: usize,
    direction: f64,
    tolerance: f64,
    prob: f64,
    cell_size: f64,
    nodata_only: bool,
) -> ShelterParams {
    ShelterParams {
        radius,
        direction,
        tolerance,
        prob,
        cell_size,
        missing: if nodata_only {
            MissingPolicy::NodataOnly
        } else {
            MissingPolicy::NodataAndZero
        },
    }
}

/// Distance grid and sector mask for one radius and sector.
///
/// Returns:
///     (dist, mask): float64 and bool arrays of shape (2*radius+1, 2*radius+1).
#[pyfunction]
pub fn windshelter_prep(
    py: Python<'_>,
    radius: usize,
    direction: f64,
    tolerance: f64,
    cell_size: f64,
) -> PyResult<(Py<PyArray2<f64>>, Py<PyArray2<bool>>)> {
    let (dist, mask) = build_mask(radius, direction, tolerance, cell_size)?.into_parts();
    Ok((dist.into_pyarray(py).unbind(), mask.into_pyarray(py).unbind()))
}

/// Wind shelter index for a 2D elevation grid.
///
/// Args:
///     dem: 2D float64 elevation array.
///     nodata: Nodata sentinel of the DEM, or None.
///     radius: Window half-size in cells.
///     direction: Sector start in degrees, clockwise.
///     tolerance: Sector width in degrees.
///     prob: Quantile in [0, 1].
///     cell_size: Ground distance per cell.
///     nodata_only: Treat only `nodata` as missing (zero elevations are kept).
///
/// Returns:
///     float64 array shaped like `dem`; border cells are 0, windows without
///     usable cells are NaN.
#[pyfunction]
#[pyo3(signature = (dem, nodata, radius=8, direction=180.0, tolerance=45.0, prob=0.5, cell_size=10.0, nodata_only=false))]
#[allow(clippy::too_many_arguments)]
pub fn windshelter_grid(
    py: Python<'_>,
    dem: PyReadonlyArray2<f64>,
    nodata: Option<f64>,
    radius: usize,
    direction: f64,
    tolerance: f64,
    prob: f64,
    cell_size: f64,
    nodata_only: bool,
) -> PyResult<Py<PyArray2<f64>>> {
    let params = params_from_args(radius, direction, tolerance, prob, cell_size, nodata_only);
    let dem_owned = dem.as_array().to_owned();

    let result = py.allow_threads(|| {
        compute_interior(dem_owned.view(), nodata, &params, None, None)
            .map(|interior| pad_border(interior.view(), params.radius, BORDER_FILL))
    })?;
    Ok(result.into_pyarray(py).unbind())
}

/// Runner that exposes pollable progress() and cancel() for long grids.
///
/// Usage from Python:
///   runner = WindShelterRunner()
///   # launch runner.compute(...) in a thread
///   # poll runner.progress() (rows of valid centres completed)
///   # call runner.cancel() to stop early
#[pyclass]
pub struct WindShelterRunner {
    progress: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl Default for WindShelterRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[pymethods]
impl WindShelterRunner {
    #[new]
    pub fn new() -> Self {
        Self {
            progress: Arc::new(AtomicUsize::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[pyo3(signature = (dem, nodata, radius=8, direction=180.0, tolerance=45.0, prob=0.5, cell_size=10.0, nodata_only=false))]
    #[allow(clippy::too_many_arguments)]
    pub fn compute(
        &self,
        py: Python<'_>,
        dem: PyReadonlyArray2<f64>,
        nodata: Option<f64>,
        radius: usize,
        direction: f64,
        tolerance: f64,
        prob: f64,
        cell_size: f64,
        nodata_only: bool,
    ) -> PyResult<Py<PyArray2<f64>>> {
        self.progress.store(0, Ordering::Relaxed);
        self.cancelled.store(false, Ordering::Relaxed);

        let params = params_from_args(radius, direction, tolerance, prob, cell_size, nodata_only);
        let dem_owned = dem.as_array().to_owned();
        let counter = Some(self.progress.clone());
        let cancel = Some(self.cancelled.clone());

        let result = py.allow_threads(|| {
            compute_interior(dem_owned.view(), nodata, &params, counter, cancel)
                .map(|interior| pad_border(interior.view(), params.radius, BORDER_FILL))
        })?;
        Ok(result.into_pyarray(py).unbind())
    }
}
