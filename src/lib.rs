//! Directional wind shelter index for elevation grids.
//!
//! For every interior cell, the upwind terrain inside a fixed angular sector
//! and radius is reduced to a quantile of local shelter angles.

pub mod error;
#[cfg(feature = "gdal")]
pub mod io;
pub mod mask;
pub mod params;
#[cfg(feature = "python")]
mod python;
pub mod shelter;
pub mod window;

pub use error::{Result, ShelterError};
pub use mask::{build_mask, SectorMask};
pub use params::{MissingPolicy, ShelterParams};
pub use shelter::{
    compute_interior, count_missing, pad_border, windshelter, ShelterKernel, BORDER_FILL,
};
pub use window::WindowGrid;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
#[pyo3(name = "windshelter")]
fn windshelter_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    register_shelter_module(py_module)?;

    py_module.add("__doc__", "Directional wind shelter index implemented in Rust.")?;

    Ok(())
}

#[cfg(feature = "python")]
fn register_shelter_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "shelter")?;
    submodule.add("__doc__", "Sector mask and wind shelter grid.")?;
    submodule.add_function(wrap_pyfunction!(python::windshelter_prep, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(python::windshelter_grid, &submodule)?)?;
    submodule.add_class::<python::WindShelterRunner>()?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}
