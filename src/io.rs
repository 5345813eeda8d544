//! GeoTIFF input and output through GDAL.
//!
//! The elevation grid is read from the last band of the input as `f64`;
//! the result is written as a single Float64 band named `windshelter.tif`
//! with the input's geotransform, projection and nodata value.

use std::path::{Path, PathBuf};

use gdal::raster::{Buffer, RasterBand};
use gdal::{Dataset, DriverManager};
use log::{debug, info, warn};
use ndarray::Array2;

use crate::error::{Result, ShelterError};

pub const OUTPUT_FILE_NAME: &str = "windshelter.tif";

#[derive(Debug, Clone)]
pub struct RasterMetadata {
    pub width: usize,
    pub height: usize,
    pub geotransform: [f64; 6],
    pub projection: String,
    pub nodata: Option<f64>,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

/// Read the last band of `path` and its spatial metadata.
pub fn read_elevation<P: AsRef<Path>>(path: P) -> Result<(Array2<f64>, RasterMetadata)> {
    let path = path.as_ref();
    info!("Opening input raster: {}", path.display());
    let dataset = Dataset::open(path)?;

    let band_count = dataset.raster_count() as usize;
    if band_count == 0 {
        return Err(ShelterError::NoBands {
            path: path.display().to_string(),
        });
    }
    let rasterband: RasterBand = dataset.rasterband(band_count)?;

    let width = rasterband.x_size() as usize;
    let height = rasterband.y_size() as usize;
    let nodata = rasterband.no_data_value();

    let geotransform = dataset.geo_transform()?;
    let pixel_width = geotransform[1].abs();
    let pixel_height = geotransform[5].abs();

    if (pixel_width - pixel_height).abs() > 1e-9 {
        warn!(
            "Non-square pixels ({:.6} x {:.6}), using width as cell size",
            pixel_width, pixel_height
        );
    }

    debug!(
        "Reading band {} (last): {}x{}, nodata={:?}",
        band_count, width, height, nodata
    );

    let buffer = rasterband.read_as::<f64>((0, 0), (width, height), (width, height), None)?;
    let data_vec: Vec<f64> = buffer.into_iter().collect();
    let data = Array2::from_shape_vec((height, width), data_vec)?;

    let metadata = RasterMetadata {
        width,
        height,
        geotransform,
        projection: dataset.projection(),
        nodata,
        pixel_width,
        pixel_height,
    };

    Ok((data, metadata))
}

/// Write `data` to `<output_dir>/windshelter.tif` and return that path.
///
/// A partially written file is removed when any step fails.
pub fn write_windshelter<P: AsRef<Path>>(
    output_dir: P,
    data: &Array2<f64>,
    metadata: &RasterMetadata,
) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(OUTPUT_FILE_NAME);
    info!("Creating output raster: {}", path.display());

    if let Err(err) = write_band(&path, data, metadata) {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Could not remove partial output {}: {}", path.display(), e);
            }
        }
        return Err(err);
    }

    Ok(path)
}

fn write_band(path: &Path, data: &Array2<f64>, metadata: &RasterMetadata) -> Result<()> {
    let (rows, cols) = data.dim();
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut dataset = driver.create_with_band_type::<f64, _>(path, cols, rows, 1)?;

    dataset.set_geo_transform(&metadata.geotransform)?;
    if !metadata.projection.is_empty() {
        dataset.set_projection(&metadata.projection)?;
    }

    {
        let mut band = dataset.rasterband(1)?;
        if let Some(nd) = metadata.nodata {
            band.set_no_data_value(Some(nd))?;
        }

        let values: Vec<f64> = data.iter().copied().collect();
        let mut buffer = Buffer::new((cols, rows), values);
        band.write((0, 0), (cols, rows), &mut buffer)?;
    }

    // Flush errors surface here instead of being lost in Drop
    dataset.close()?;
    debug!("Wrote {}x{} Float64 band", cols, rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ShelterParams;
    use crate::shelter::windshelter;

    fn write_dem(path: &Path, data: &Array2<f64>, metadata: &RasterMetadata) {
        let (rows, cols) = data.dim();
        let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
        let mut ds = driver.create_with_band_type::<f64, _>(path, cols, rows, 1).unwrap();
        ds.set_geo_transform(&metadata.geotransform).unwrap();
        let mut band = ds.rasterband(1).unwrap();
        band.set_no_data_value(metadata.nodata).unwrap();
        let mut buffer = Buffer::new((cols, rows), data.iter().copied().collect());
        band.write((0, 0), (cols, rows), &mut buffer).unwrap();
    }

    fn sample_metadata(rows: usize, cols: usize) -> RasterMetadata {
        RasterMetadata {
            width: cols,
            height: rows,
            geotransform: [500_000.0, 10.0, 0.0, 6_900_000.0, 0.0, -10.0],
            projection: String::new(),
            nodata: Some(-9999.0),
            pixel_width: 10.0,
            pixel_height: 10.0,
        }
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let (rows, cols) = (12, 15);
        let metadata = sample_metadata(rows, cols);
        let dem = Array2::from_shape_fn((rows, cols), |(i, j)| 200.0 + (i as f64) * 3.5 - (j as f64) * 1.25);
        let dem_path = dir.path().join("dem.tif");
        write_dem(&dem_path, &dem, &metadata);

        let (read_back, read_meta) = read_elevation(&dem_path).unwrap();
        assert_eq!(read_back, dem);
        assert_eq!(read_meta.geotransform, metadata.geotransform);
        assert_eq!(read_meta.nodata, Some(-9999.0));
        assert_eq!(read_meta.pixel_width, 10.0);

        let params = ShelterParams { radius: 2, cell_size: read_meta.pixel_width, ..Default::default() };
        let result = windshelter(read_back.view(), read_meta.nodata, &params).unwrap();
        let out_path = write_windshelter(dir.path().join("out"), &result, &read_meta).unwrap();
        assert!(out_path.ends_with(OUTPUT_FILE_NAME));

        let (written, written_meta) = read_elevation(&out_path).unwrap();
        assert_eq!(written_meta.geotransform, metadata.geotransform);
        assert_eq!(written.dim(), (rows, cols));
        for (a, b) in written.iter().zip(result.iter()) {
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_elevation(dir.path().join("nope.tif")).is_err());
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let mut metadata = sample_metadata(6, 6);
        metadata.projection = "not a wkt".to_string();
        let data = Array2::from_elem((6, 6), 1.0);

        let result = write_windshelter(&out_dir, &data, &metadata);
        assert!(matches!(result, Err(ShelterError::Gdal(_))));
        assert!(!out_dir.join(OUTPUT_FILE_NAME).exists());
    }

    #[test]
    fn test_written_file_is_complete_on_return() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = sample_metadata(5, 7);
        let data = Array2::from_shape_fn((5, 7), |(i, j)| (i * 7 + j) as f64);
        let path = write_windshelter(dir.path(), &data, &metadata).unwrap();

        let (read_back, read_meta) = read_elevation(&path).unwrap();
        assert_eq!(read_back, data);
        assert_eq!(read_meta.nodata, Some(-9999.0));
    }
}
