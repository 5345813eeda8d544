use clap::{Parser, ValueEnum};
use windshelter::MissingPolicy;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MissingArg {
    /// Nodata and exact zero elevations are both missing
    NodataAndZero,
    /// Only the nodata value is missing
    NodataOnly,
}

impl From<MissingArg> for MissingPolicy {
    fn from(arg: MissingArg) -> Self {
        match arg {
            MissingArg::NodataAndZero => MissingPolicy::NodataAndZero,
            MissingArg::NodataOnly => MissingPolicy::NodataOnly,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "windshelter")]
#[command(about = "Compute a directional wind shelter index from an elevation GeoTIFF")]
#[command(version)]
pub struct Args {
    /// Input elevation GeoTIFF (the last band is used)
    #[arg(short, long, value_name = "FILE")]
    pub input: String,

    /// Directory receiving windshelter.tif
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: String,

    /// Window half-size in cells
    #[arg(short, long, default_value_t = 8)]
    pub radius: usize,

    /// Sector start in degrees, clockwise
    #[arg(short, long, default_value_t = 180.0)]
    pub direction: f64,

    /// Sector width in degrees
    #[arg(short, long, default_value_t = 45.0)]
    pub tolerance: f64,

    /// Quantile of shelter angles, in [0, 1]
    #[arg(short, long, default_value_t = 0.5)]
    pub prob: f64,

    /// Ground distance per cell (default: horizontal scale of the geotransform)
    #[arg(short, long, value_name = "METERS")]
    pub cell_size: Option<f64>,

    /// Override nodata value (default: read from input)
    #[arg(long, value_name = "VALUE")]
    pub nodata: Option<f64>,

    /// Which cell values count as missing
    #[arg(long, value_enum, default_value_t = MissingArg::NodataAndZero)]
    pub missing: MissingArg,

    /// Number of threads (default: all available)
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
