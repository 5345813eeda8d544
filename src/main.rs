use clap::Parser;
use env_logger::Env;
use log::info;

use windshelter::io::{read_elevation, write_windshelter};
use windshelter::{windshelter, Result, ShelterParams};

mod cli;

use cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("=== Wind Shelter Index ===");

    if let Some(n_threads) = args.threads {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build_global()
        {
            Ok(()) => info!("Using {} threads", n_threads),
            Err(e) => log::warn!("Could not size thread pool ({}), using default", e),
        }
    } else {
        info!("Using all available threads");
    }

    let (data, metadata) = read_elevation(&args.input)?;
    info!("Raster size: {}x{}", metadata.width, metadata.height);

    let nodata = args.nodata.or(metadata.nodata);
    match nodata {
        Some(nd) => info!("Using nodata value: {}", nd),
        None => info!("No nodata value specified"),
    }

    let params = ShelterParams {
        radius: args.radius,
        direction: args.direction,
        tolerance: args.tolerance,
        prob: args.prob,
        cell_size: args.cell_size.unwrap_or(metadata.pixel_width),
        missing: args.missing.into(),
    };
    params.validate()?;
    info!("Cell size: {}", params.cell_size);

    let result = windshelter(data.view(), nodata, &params)?;

    let mut out_meta = metadata;
    out_meta.nodata = nodata;
    let path = write_windshelter(&args.output_dir, &result, &out_meta)?;

    println!("{}", path.display());
    info!("=== Done! ===");
    Ok(())
}
