use ndarray::Array2;

use crate::consts::MAX_SUBPIXEL_OFFSET;

/// Sub-sample peak offset of the parabola through samples at `x = -1, 0, +1`.
///
/// Returns `None` when the samples are not finite or the parabola is not
/// concave. The offset is clamped to +/- [`MAX_SUBPIXEL_OFFSET`].
pub fn parabolic_offset(fm: f64, f0: f64, fp: f64) -> Option<f64> {
    if !fm.is_finite() || !f0.is_finite() || !fp.is_finite() {
        return None;
    }

    let denom = fm - 2.0 * f0 + fp;
    if denom > -1e-12 {
        return None;
    }

    let delta = 0.5 * (fm - fp) / denom;
    delta
        .is_finite()
        .then(|| delta.clamp(-MAX_SUBPIXEL_OFFSET, MAX_SUBPIXEL_OFFSET))
}

/// Value of the fitted parabola at its vertex `delta`.
pub fn parabolic_peak_value(fm: f64, f0: f64, fp: f64, delta: f64) -> f64 {
    f0 - 0.25 * (fm - fp) * delta
}

/// Refine the peak of a circular (FFT) correlation surface using a 1D
/// parabola along each axis. Neighbours wrap around the surface edges.
///
/// Returns (delta_row, delta_col) as fractional pixel offsets from the integer peak.
pub fn refine_peak_circular(surface: &Array2<f64>, peak_row: usize, peak_col: usize) -> (f64, f64) {
    let (h, w) = surface.dim();
    if h < 3 || w < 3 {
        return (0.0, 0.0);
    }

    let up = (peak_row + h - 1) % h;
    let down = (peak_row + 1) % h;
    let left = (peak_col + w - 1) % w;
    let right = (peak_col + 1) % w;
    let center = surface[[peak_row, peak_col]];

    let delta_row =
        parabolic_offset(surface[[up, peak_col]], center, surface[[down, peak_col]]).unwrap_or(0.0);
    let delta_col =
        parabolic_offset(surface[[peak_row, left]], center, surface[[peak_row, right]])
            .unwrap_or(0.0);

    (delta_row, delta_col)
}
