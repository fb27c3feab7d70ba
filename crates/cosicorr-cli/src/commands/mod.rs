pub mod batch;
pub mod config;
pub mod correlate;
pub mod info;
pub mod multiband;
pub mod options;
