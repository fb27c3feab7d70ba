use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Pixel-to-ground affine transform, GDAL coefficient order:
///
/// `x = c0 + col * c1 + row * c2`, `y = c3 + col * c4 + row * c5`
///
/// Used only to tag outputs; correlation math runs in pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform(pub [f64; 6]);

impl Default for GeoTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl GeoTransform {
    pub fn identity() -> Self {
        Self([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Ground coordinate of the top-left corner of pixel (row, col).
    pub fn pixel_to_ground(&self, row: f64, col: f64) -> (f64, f64) {
        let c = &self.0;
        (
            c[0] + col * c[1] + row * c[2],
            c[3] + col * c[4] + row * c[5],
        )
    }

    pub fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    pub fn pixel_height(&self) -> f64 {
        self.0[5]
    }

    /// Transform of a grid whose first cell sits at pixel (row0, col0) and
    /// whose cells are `step_row` x `step_col` pixels apart.
    pub fn resampled(&self, row0: usize, col0: usize, step_row: usize, step_col: usize) -> Self {
        let (x0, y0) = self.pixel_to_ground(row0 as f64, col0 as f64);
        let c = &self.0;
        let (sr, sc) = (step_row as f64, step_col as f64);
        Self([x0, c[1] * sc, c[2] * sr, y0, c[4] * sc, c[5] * sr])
    }
}

/// A single raster band held in memory.
///
/// Samples are `f64` regardless of the on-disk sample format. `valid` marks
/// pixels that carry data (false for nodata and non-finite samples).
#[derive(Clone, Debug)]
pub struct RasterBand {
    /// Sample data, row-major, shape = (height, width)
    pub data: Array2<f64>,
    /// Per-pixel validity mask, same shape as `data`
    pub valid: Array2<bool>,
    pub geotransform: GeoTransform,
}

impl RasterBand {
    /// Wrap an array with an identity geotransform; non-finite samples are invalid.
    pub fn new(data: Array2<f64>) -> Self {
        Self::with_nodata(data, None, GeoTransform::identity())
    }

    /// Build a band whose samples equal to `nodata` (or non-finite) are invalid.
    pub fn with_nodata(data: Array2<f64>, nodata: Option<f64>, geotransform: GeoTransform) -> Self {
        let valid = data.mapv(|v| v.is_finite() && nodata.map_or(true, |nd| v != nd));
        Self {
            data,
            valid,
            geotransform,
        }
    }

    pub fn with_geotransform(mut self, geotransform: GeoTransform) -> Self {
        self.geotransform = geotransform;
        self
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }
}
