pub mod batch;
pub mod config;
pub mod consts;
pub mod correlate;
pub mod engine;
pub mod error;
pub mod grid;
pub mod io;
pub mod raster;
pub mod window;
