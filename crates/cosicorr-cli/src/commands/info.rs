use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use cosicorr_core::io::raster_info;

#[derive(Args)]
pub struct InfoArgs {
    /// Input raster
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let info = raster_info(&args.file)?;
    let gt = &info.geotransform.0;

    println!("File:          {}", args.file.display());
    println!("Dimensions:    {}x{}", info.width, info.height);
    println!("Bands:         {}", info.bands);
    if info.geotransform.is_identity() {
        println!("Geotransform:  none");
    } else {
        println!("Origin:        ({}, {})", gt[0], gt[3]);
        println!("Pixel size:    ({}, {})", gt[1], gt[5]);
        if gt[2] != 0.0 || gt[4] != 0.0 {
            println!("Rotation:      ({}, {})", gt[2], gt[4]);
        }
    }
    if let Some(nodata) = info.nodata {
        println!("Nodata:        {}", nodata);
    }

    Ok(())
}
