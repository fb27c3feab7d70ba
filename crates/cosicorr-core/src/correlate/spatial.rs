use ndarray::{s, Array2, ArrayView2};

use crate::config::SpatialConfig;
use crate::consts::VARIANCE_EPSILON;

use super::subpixel::{parabolic_offset, parabolic_peak_value};
use super::{mean_and_energy, CellResult, CellStatus};

/// Normalized cross-correlation over a bounded integer offset range.
pub struct SpatialCorrelator {
    config: SpatialConfig,
}

impl SpatialCorrelator {
    pub fn new(config: SpatialConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    /// Estimate the shift of `target` relative to `base`.
    ///
    /// `target` is the search region, centered on the same point as `base`;
    /// offsets are limited to the configured search range and to what the
    /// region can hold.
    pub fn correlate(&self, base: ArrayView2<f64>, target: ArrayView2<f64>) -> CellResult {
        let (bh, bw) = base.dim();
        let (th, tw) = target.dim();
        if th < bh || tw < bw {
            return CellResult::invalid(CellStatus::OutOfBounds);
        }

        let range_row = self.config.search_range.row.min((th - bh) / 2);
        let range_col = self.config.search_range.col.min((tw - bw) / 2);

        let (base_mean, base_energy) = mean_and_energy(base);
        if base_energy / (base.len() as f64) < VARIANCE_EPSILON {
            return CellResult::invalid(CellStatus::Degenerate);
        }
        let base_centered = base.mapv(|v| v - base_mean);

        // Top-left corner of the zero-offset sub-patch inside the target region.
        let origin_row = (th - bh) / 2 - range_row;
        let origin_col = (tw - bw) / 2 - range_col;

        let coefficients = Array2::from_shape_fn((2 * range_row + 1, 2 * range_col + 1), |(i, j)| {
            let r0 = origin_row + i;
            let c0 = origin_col + j;
            let candidate = target.slice(s![r0..r0 + bh, c0..c0 + bw]);
            ncc(base_centered.view(), base_energy, candidate)
        });

        let Some((best_i, best_j)) = select_peak(&coefficients, range_row, range_col) else {
            return CellResult::invalid(CellStatus::Degenerate);
        };

        let f0 = coefficients[[best_i, best_j]];
        let mut score = f0;

        let mut delta_row = 0.0;
        if best_i > 0 && best_i + 1 < coefficients.nrows() {
            let (fm, fp) = (
                coefficients[[best_i - 1, best_j]],
                coefficients[[best_i + 1, best_j]],
            );
            if let Some(delta) = parabolic_offset(fm, f0, fp) {
                delta_row = delta;
                score += parabolic_peak_value(fm, f0, fp, delta) - f0;
            }
        }

        let mut delta_col = 0.0;
        if best_j > 0 && best_j + 1 < coefficients.ncols() {
            let (fm, fp) = (
                coefficients[[best_i, best_j - 1]],
                coefficients[[best_i, best_j + 1]],
            );
            if let Some(delta) = parabolic_offset(fm, f0, fp) {
                delta_col = delta;
                score += parabolic_peak_value(fm, f0, fp, delta) - f0;
            }
        }

        let dy = best_i as f64 - range_row as f64 + delta_row;
        let dx = best_j as f64 - range_col as f64 + delta_col;
        CellResult::valid(dx, dy, score.clamp(-1.0, 1.0), 0)
    }
}

/// Normalized cross-correlation coefficient of a candidate against a
/// mean-centered base patch. Undefined (zero-variance) candidates score
/// negative infinity.
fn ncc(base_centered: ArrayView2<f64>, base_energy: f64, candidate: ArrayView2<f64>) -> f64 {
    let (mean, energy) = mean_and_energy(candidate);
    if energy / (candidate.len() as f64) < VARIANCE_EPSILON {
        return f64::NEG_INFINITY;
    }

    let cross: f64 = base_centered
        .iter()
        .zip(candidate.iter())
        .map(|(&b, &t)| b * (t - mean))
        .sum();
    (cross / (base_energy * energy).sqrt()).clamp(-1.0, 1.0)
}

/// Index of the maximum coefficient. Exact ties go to the smallest squared
/// offset length, then the smaller |row|, the smaller |col|, and finally the
/// negative offset.
fn select_peak(coefficients: &Array2<f64>, range_row: usize, range_col: usize) -> Option<(usize, usize)> {
    let key = |i: usize, j: usize| {
        let orow = i as i64 - range_row as i64;
        let ocol = j as i64 - range_col as i64;
        (orow * orow + ocol * ocol, orow.abs(), ocol.abs(), orow, ocol)
    };

    let mut best: Option<(usize, usize, f64)> = None;
    for ((i, j), &coef) in coefficients.indexed_iter() {
        if !coef.is_finite() {
            continue;
        }
        let better = match best {
            None => true,
            Some((bi, bj, bc)) => coef > bc || (coef == bc && key(i, j) < key(bi, bj)),
        };
        if better {
            best = Some((i, j, coef));
        }
    }
    best.map(|(i, j, _)| (i, j))
}
