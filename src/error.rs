use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelterError {
    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Input grid {rows}x{cols} is smaller than the {side}x{side} window")]
    InputTooSmall { rows: usize, cols: usize, side: usize },

    #[error("Wind shelter computation cancelled")]
    Cancelled,

    #[error("Raster has no bands: {path}")]
    NoBands { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(gdal::errors::GdalError),
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for ShelterError {
    fn from(err: gdal::errors::GdalError) -> Self {
        ShelterError::Gdal(err)
    }
}

impl ShelterError {
    pub(crate) fn invalid(name: &'static str, value: impl ToString, reason: &'static str) -> Self {
        ShelterError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShelterError>;
