pub mod raster_io;

pub use raster_io::{
    band_count, load_band, raster_info, write_bands, write_displacement_field, RasterInfo,
};
