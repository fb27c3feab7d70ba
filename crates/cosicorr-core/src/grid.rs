use ndarray::Array2;

use crate::config::{CorrelationConfig, GridMode, HalfSize, Step};
use crate::error::{CorrelationError, Result};
use crate::raster::GeoTransform;

/// Parameters the grid is derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridParams {
    pub base_half: HalfSize,
    /// Half-size of the region read from the target image around each center.
    pub target_half: HalfSize,
    pub step: Step,
    pub mode: GridMode,
    /// Extra (row, col) offset of the first regular-grid center beyond the half-size.
    pub first_center_offset: (usize, usize),
}

impl GridParams {
    /// Resolve grid parameters from a correlation config. `geotransform` is
    /// only consulted when `align_to_ground` is set.
    pub fn from_config(config: &CorrelationConfig, geotransform: &GeoTransform) -> Self {
        let base_half = config.correlator.window_size().base_half();
        let mode = config.effective_grid_mode();
        let step = config.effective_step();

        let first_center_offset = if config.align_to_ground && mode == GridMode::Regular {
            (
                ground_alignment_offset(
                    geotransform.0[3],
                    geotransform.pixel_height(),
                    base_half.rows,
                    step.row,
                ),
                ground_alignment_offset(
                    geotransform.0[0],
                    geotransform.pixel_width(),
                    base_half.cols,
                    step.col,
                ),
            )
        } else {
            (0, 0)
        };

        Self {
            base_half,
            target_half: config.correlator.target_extent(),
            step,
            mode,
            first_center_offset,
        }
    }
}

/// Smallest shift past `half` that puts the first center on a multiple of
/// `step` in ground-pixel units.
fn ground_alignment_offset(origin: f64, pixel_size: f64, half: usize, step: usize) -> usize {
    if pixel_size == 0.0 || !pixel_size.is_finite() || step <= 1 {
        return 0;
    }
    let origin_index = (origin / pixel_size).round() as i64;
    (-(origin_index + half as i64)).rem_euclid(step as i64) as usize
}

/// Ordered set of sampling centers in base-image pixel space.
///
/// Centers are the Cartesian product of `row_centers` and `col_centers`,
/// enumerated row-major. Centers whose target region does not fit inside the
/// target image are kept but flagged invalid so the output keeps its shape.
#[derive(Clone, Debug)]
pub struct SamplingGrid {
    pub row_centers: Vec<usize>,
    pub col_centers: Vec<usize>,
    pub step: Step,
    pub base_half: HalfSize,
    pub target_half: HalfSize,
    /// Shape = (row_centers.len(), col_centers.len())
    pub valid: Array2<bool>,
}

impl SamplingGrid {
    /// (rows, cols) of the grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.row_centers.len(), self.col_centers.len())
    }

    pub fn len(&self) -> usize {
        self.row_centers.len() * self.col_centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Center of the cell at row-major `index`.
    pub fn center(&self, index: usize) -> (usize, usize) {
        let cols = self.col_centers.len();
        (self.row_centers[index / cols], self.col_centers[index % cols])
    }

    pub fn centers(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.row_centers
            .iter()
            .flat_map(move |&r| self.col_centers.iter().map(move |&c| (r, c)))
    }

    pub fn is_valid(&self, index: usize) -> bool {
        let cols = self.col_centers.len();
        self.valid[[index / cols, index % cols]]
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Georeferencing for an output raster with one pixel per grid cell.
    pub fn output_geotransform(&self, base: &GeoTransform) -> GeoTransform {
        let row0 = self.row_centers.first().copied().unwrap_or(0);
        let col0 = self.col_centers.first().copied().unwrap_or(0);
        base.resampled(row0, col0, self.step.row, self.step.col)
    }
}

fn axis_centers(dim: usize, half: usize, step: usize, offset: usize) -> Vec<usize> {
    let mut centers = Vec::new();
    let mut c = half + offset;
    while c + half < dim {
        centers.push(c);
        c += step;
    }
    centers
}

/// Build the sampling grid for a base image of `base_dim` = (H, W) and a
/// target image of `target_dim`.
///
/// Fails with a configuration error when the base window's half-size reaches
/// half of the smaller base dimension, and with `EmptyResult` when no center
/// survives (e.g. a ground-alignment offset pushing every center out).
pub fn build_grid(
    base_dim: (usize, usize),
    target_dim: (usize, usize),
    params: &GridParams,
) -> Result<SamplingGrid> {
    let (h, w) = base_dim;
    let half = params.base_half;
    let min_dim = h.min(w);
    let max_half = half.rows.max(half.cols);

    if 2 * max_half >= min_dim {
        return Err(CorrelationError::config(format!(
            "window half-size {} must be smaller than half of the smaller image dimension {} \
             (image {}x{}); the grid would be empty",
            max_half, min_dim, h, w
        )));
    }

    let (row_centers, col_centers) = match params.mode {
        GridMode::Regular => (
            axis_centers(h, half.rows, params.step.row, params.first_center_offset.0),
            axis_centers(w, half.cols, params.step.col, params.first_center_offset.1),
        ),
        GridMode::PixelWise => (
            axis_centers(h, half.rows, 1, 0),
            axis_centers(w, half.cols, 1, 0),
        ),
    };

    if row_centers.is_empty() || col_centers.is_empty() {
        return Err(CorrelationError::EmptyResult {
            height: h,
            width: w,
            reason: format!(
                "no center fits with half-size {}x{}, step {}x{}",
                half.rows, half.cols, params.step.row, params.step.col
            ),
        });
    }

    let (th, tw) = target_dim;
    let t = params.target_half;
    let fits = |center: usize, half: usize, dim: usize| center >= half && center + half < dim;
    let valid = Array2::from_shape_fn((row_centers.len(), col_centers.len()), |(i, j)| {
        fits(row_centers[i], t.rows, th) && fits(col_centers[j], t.cols, tw)
    });

    Ok(SamplingGrid {
        row_centers,
        col_centers,
        step: match params.mode {
            GridMode::Regular => params.step,
            GridMode::PixelWise => Step { row: 1, col: 1 },
        },
        base_half: half,
        target_half: t,
        valid,
    })
}
