use ndarray::{s, ArrayView2};

use crate::config::HalfSize;
use crate::error::{CorrelationError, Result};
use crate::raster::RasterBand;

/// Borrowed patch of a raster band together with its validity mask.
#[derive(Clone, Copy, Debug)]
pub struct Window<'a> {
    pub data: ArrayView2<'a, f64>,
    pub valid: ArrayView2<'a, bool>,
}

impl Window<'_> {
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// True when every pixel in the window carries data.
    pub fn is_complete(&self) -> bool {
        self.valid.iter().all(|&v| v)
    }
}

/// Extract the `(2·half.rows + 1) x (2·half.cols + 1)` patch centered at
/// `center` = (row, col).
///
/// Never clamps: a patch reaching past the band edge is an `OutOfBounds` error.
pub fn extract_window(band: &RasterBand, center: (usize, usize), half: HalfSize) -> Result<Window<'_>> {
    let (h, w) = band.dim();
    let (row, col) = center;
    let (rows, cols) = half.shape();

    if row < half.rows || col < half.cols || row + half.rows >= h || col + half.cols >= w {
        return Err(CorrelationError::OutOfBounds {
            row,
            col,
            rows,
            cols,
            height: h,
            width: w,
        });
    }

    let r0 = row - half.rows;
    let c0 = col - half.cols;
    let region = s![r0..r0 + rows, c0..c0 + cols];

    Ok(Window {
        data: band.data.slice(region),
        valid: band.valid.slice(region),
    })
}
