use std::sync::Arc;

use ndarray::{Array2, ArrayView2, Axis};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Precomputed forward/inverse FFT plans for one patch shape.
///
/// Plans are immutable and shared across worker threads.
pub struct SpectralPlan {
    height: usize,
    width: usize,
    row_forward: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl SpectralPlan {
    pub fn new(height: usize, width: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            height,
            width,
            row_forward: planner.plan_fft_forward(width),
            col_forward: planner.plan_fft_forward(height),
            row_inverse: planner.plan_fft_inverse(width),
            col_inverse: planner.plan_fft_inverse(height),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// 2D forward FFT: row-wise, then column-wise.
    pub fn forward(&self, data: &Array2<f64>) -> Array2<Complex<f64>> {
        debug_assert_eq!(data.dim(), self.dim());
        let mut work = data.mapv(|v| Complex::new(v, 0.0));
        transform_lanes(&mut work, Axis(1), self.row_forward.as_ref());
        transform_lanes(&mut work, Axis(0), self.col_forward.as_ref());
        work
    }

    /// 2D inverse FFT, returning the real part normalized by `1/(h*w)`.
    pub fn inverse_real(&self, spectrum: &Array2<Complex<f64>>) -> Array2<f64> {
        debug_assert_eq!(spectrum.dim(), self.dim());
        let mut work = spectrum.clone();
        transform_lanes(&mut work, Axis(0), self.col_inverse.as_ref());
        transform_lanes(&mut work, Axis(1), self.row_inverse.as_ref());
        let scale = 1.0 / (self.height * self.width) as f64;
        work.mapv(|v| v.re * scale)
    }
}

/// Run `fft` over every lane of `work` along `axis`.
fn transform_lanes(work: &mut Array2<Complex<f64>>, axis: Axis, fft: &dyn Fft<f64>) {
    let mut buffer = Vec::with_capacity(work.len_of(axis));
    for mut lane in work.lanes_mut(axis) {
        buffer.clear();
        buffer.extend(lane.iter().copied());
        fft.process(&mut buffer);
        for (dst, &src) in lane.iter_mut().zip(buffer.iter()) {
            *dst = src;
        }
    }
}

/// Remove the mean and apply a 2D Hann window to reduce spectral leakage.
pub fn apodize(data: ArrayView2<f64>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mean = data.mean().unwrap_or(0.0);
    let wy: Vec<f64> = hann(h);
    let wx: Vec<f64> = hann(w);

    Array2::from_shape_fn((h, w), |(row, col)| (data[[row, col]] - mean) * wy[row] * wx[col])
}

fn hann(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (std::f64::consts::TAU * i as f64 / n as f64).cos()))
        .collect()
}

/// Signed frequency index of bin `k` in an `n`-point transform.
pub fn signed_frequency(k: usize, n: usize) -> f64 {
    if k > n / 2 {
        k as f64 - n as f64
    } else {
        k as f64
    }
}

/// Location and value of the maximum of a surface. Ties keep the first
/// occurrence in row-major order.
pub fn find_peak(data: &Array2<f64>) -> (usize, usize, f64) {
    let mut best = (0, 0, f64::NEG_INFINITY);
    for ((row, col), &val) in data.indexed_iter() {
        if val > best.2 {
            best = (row, col, val);
        }
    }
    best
}
