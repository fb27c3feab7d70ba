//! Phase correlation with iterative frequency masking.
//!
//! 1. **Coarse**: the normalized cross-power spectrum `Q` of the two apodized
//!    patches is inverted; the peak of the resulting surface, refined with a
//!    parabola on each axis, gives the first estimate `d`.
//! 2. **Refinement**: a pure translation `d` predicts the phasor
//!    `M_d(u, v) = exp(i (a_u dy + b_v dx))` with `a_u = -2π u / h` and
//!    `b_v = -2π v / w` (signed frequencies `u`, `v`). Each iteration keeps the
//!    components with `(1 + Re(Q · conj(M_d))) / 2 >= mask_threshold` and fits
//!    their residual phase `φ = arg(Q · conj(M_d)) ≈ a_u δy + b_v δx` by
//!    weighted least squares (weights `|T · conj(B)|`):
//!
//!    ```text
//!    | Σ w a²  Σ w ab | |δy|   | Σ w a φ |
//!    | Σ w ab  Σ w b² | |δx| = | Σ w b φ |
//!    ```
//!
//!    then moves the estimate by `(δy, δx)`. The mask is rebuilt around every
//!    new estimate, so components rejected early rejoin the fit once the
//!    estimate is close enough. Iteration stops when the correction falls
//!    below [`CONVERGENCE_TOLERANCE`], when fewer than
//!    [`MIN_MASKED_COMPONENTS`] survive, or when the estimate drifts more than
//!    [`MAX_PHASE_FIT_DRIFT`] from the coarse peak.
//!
//! The score of an estimate is `Σ Re(Q · conj(M_d)) / N` over the kept
//! components: the masked correlation surface evaluated at the sub-pixel
//! shift. The best-scoring estimate seen is reported.

use std::f64::consts::TAU;

use ndarray::{s, Array2, ArrayView2, Zip};
use num_complex::Complex;

use crate::config::FrequencyConfig;
use crate::consts::{
    CONVERGENCE_TOLERANCE, FREQUENCY_NOISE_FLOOR, MAX_PHASE_FIT_DRIFT, MIN_MASKED_COMPONENTS,
    SPECTRUM_EPSILON, VARIANCE_EPSILON,
};

use super::fft::{apodize, find_peak, signed_frequency, SpectralPlan};
use super::subpixel::refine_peak_circular;
use super::{mean_and_energy, CellResult, CellStatus};

/// Frequency-domain correlator for one window shape.
pub struct FrequencyCorrelator {
    config: FrequencyConfig,
    plan: SpectralPlan,
}

/// Translation of the target relative to the base, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Shift {
    dy: f64,
    dx: f64,
}

/// Cross-power phasors and their fitting weights.
struct CrossPower {
    /// `T * conj(B) / |T * conj(B)|`, zero where the product vanishes.
    phasor: Array2<Complex<f64>>,
    /// `|T * conj(B)|`, scaled so the strongest component weighs 1.
    weight: Array2<f64>,
}

/// Masked agreement of the spectrum with one translation.
#[derive(Clone, Copy, Debug)]
struct PhaseFit {
    score: f64,
    kept: usize,
    /// Least-squares correction to the translation, when the kept components
    /// determine one.
    correction: Option<Shift>,
}

#[derive(Clone, Copy, Debug)]
struct Refinement {
    shift: Shift,
    score: f64,
    iterations: usize,
}

impl FrequencyCorrelator {
    pub fn new(config: FrequencyConfig) -> Self {
        let (h, w) = config.window_size.base_half().shape();
        Self {
            config,
            plan: SpectralPlan::new(h, w),
        }
    }

    pub fn config(&self) -> &FrequencyConfig {
        &self.config
    }

    /// Estimate the shift of `target` relative to `base`.
    ///
    /// A target larger than the base is cropped to the base shape around its
    /// center before correlation.
    pub fn correlate(&self, base: ArrayView2<f64>, target: ArrayView2<f64>) -> CellResult {
        let (h, w) = base.dim();
        let (th, tw) = target.dim();
        if th < h || tw < w {
            return CellResult::invalid(CellStatus::OutOfBounds);
        }
        let r0 = (th - h) / 2;
        let c0 = (tw - w) / 2;
        let target = target.slice(s![r0..r0 + h, c0..c0 + w]);

        let n = (h * w) as f64;
        let (_, base_energy) = mean_and_energy(base);
        let (_, target_energy) = mean_and_energy(target);
        if base_energy / n < VARIANCE_EPSILON || target_energy / n < VARIANCE_EPSILON {
            return CellResult::invalid(CellStatus::Degenerate);
        }

        if self.plan.dim() == (h, w) {
            self.correlate_with_plan(&self.plan, base, target)
        } else {
            self.correlate_with_plan(&SpectralPlan::new(h, w), base, target)
        }
    }

    fn correlate_with_plan(
        &self,
        plan: &SpectralPlan,
        base: ArrayView2<f64>,
        target: ArrayView2<f64>,
    ) -> CellResult {
        let base_fft = plan.forward(&apodize(base));
        let target_fft = plan.forward(&apodize(target));
        let cross = cross_power(&base_fft, &target_fft);

        let coarse = locate_peak(&plan.inverse_real(&cross.phasor));
        let refined = refine(
            &cross,
            coarse,
            self.config.mask_threshold,
            self.config.iterations,
        );

        if refined.score < FREQUENCY_NOISE_FLOOR {
            let mut result = CellResult::invalid(CellStatus::BelowNoiseFloor);
            result.iterations = refined.iterations;
            return result;
        }

        CellResult::valid(
            refined.shift.dx,
            refined.shift.dy,
            refined.score,
            refined.iterations,
        )
    }
}

/// Normalized cross-power spectrum `T * conj(B) / |T * conj(B)|`.
///
/// Its inverse peaks at the shift of the target relative to the base.
fn cross_power(base_fft: &Array2<Complex<f64>>, target_fft: &Array2<Complex<f64>>) -> CrossPower {
    let mut phasor = Array2::<Complex<f64>>::zeros(base_fft.dim());
    let mut weight = Array2::<f64>::zeros(base_fft.dim());
    Zip::from(&mut phasor)
        .and(&mut weight)
        .and(base_fft)
        .and(target_fft)
        .for_each(|q, wgt, &b, &t| {
            let cross = t * b.conj();
            let mag = cross.norm();
            if mag > SPECTRUM_EPSILON {
                *q = cross / mag;
                *wgt = mag;
            }
        });

    let max = weight.fold(0.0_f64, |m, &v| m.max(v));
    if max > 0.0 {
        weight.mapv_inplace(|v| v / max);
    }
    CrossPower { phasor, weight }
}

/// Find the surface maximum and convert it to a signed, sub-pixel shift.
fn locate_peak(surface: &Array2<f64>) -> Shift {
    let (h, w) = surface.dim();
    let (peak_row, peak_col, _) = find_peak(surface);
    let (sub_dy, sub_dx) = refine_peak_circular(surface, peak_row, peak_col);

    Shift {
        dy: signed_frequency(peak_row, h) + sub_dy,
        dx: signed_frequency(peak_col, w) + sub_dx,
    }
}

/// Phase slope per pixel of shift for each bin of an `n`-point axis.
fn phase_slopes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|k| -TAU * signed_frequency(k, n) / n as f64)
        .collect()
}

/// Score the translation `shift` against the masked spectrum and fit the
/// residual phase plane of the components that survive the mask.
fn fit_phase_plane(cross: &CrossPower, shift: Shift, threshold: f64) -> PhaseFit {
    let (h, w) = cross.phasor.dim();
    let slopes_row = phase_slopes(h);
    let slopes_col = phase_slopes(w);

    let mut kept = 0usize;
    let mut agreement = 0.0;
    let (mut saa, mut sab, mut sbb, mut sap, mut sbp) = (0.0, 0.0, 0.0, 0.0, 0.0);

    for ((row, col), &q) in cross.phasor.indexed_iter() {
        let a = slopes_row[row];
        let b = slopes_col[col];
        let residual = q * Complex::from_polar(1.0, a * shift.dy + b * shift.dx).conj();
        if 0.5 * (1.0 + residual.re) < threshold {
            continue;
        }
        kept += 1;
        agreement += residual.re;

        let phase = residual.arg();
        let wgt = cross.weight[[row, col]];
        saa += wgt * a * a;
        sab += wgt * a * b;
        sbb += wgt * b * b;
        sap += wgt * a * phase;
        sbp += wgt * b * phase;
    }

    let det = saa * sbb - sab * sab;
    let solvable = kept >= MIN_MASKED_COMPONENTS
        && saa > SPECTRUM_EPSILON
        && sbb > SPECTRUM_EPSILON
        && det > 1e-9 * saa * sbb;
    let correction = solvable.then(|| Shift {
        dy: (sbb * sap - sab * sbp) / det,
        dx: (saa * sbp - sab * sap) / det,
    });

    PhaseFit {
        score: (agreement / (h * w) as f64).clamp(0.0, 1.0),
        kept,
        correction,
    }
}

/// Iteratively re-mask and re-fit starting from `coarse`, keeping the
/// best-scoring estimate.
fn refine(cross: &CrossPower, coarse: Shift, threshold: f64, max_iterations: usize) -> Refinement {
    let mut fit = fit_phase_plane(cross, coarse, threshold);
    let mut best = Refinement {
        shift: coarse,
        score: fit.score,
        iterations: 0,
    };
    let mut current = coarse;
    let mut iterations = 0;

    while iterations < max_iterations {
        let Some(correction) = fit.correction else {
            break;
        };
        iterations += 1;

        current = Shift {
            dy: current.dy + correction.dy,
            dx: current.dx + correction.dx,
        };
        if (current.dy - coarse.dy).abs() > MAX_PHASE_FIT_DRIFT
            || (current.dx - coarse.dx).abs() > MAX_PHASE_FIT_DRIFT
        {
            break;
        }

        fit = fit_phase_plane(cross, current, threshold);
        if fit.score > best.score {
            best.shift = current;
            best.score = fit.score;
        }
        if correction.dy.hypot(correction.dx) < CONVERGENCE_TOLERANCE {
            break;
        }
    }

    best.iterations = iterations;
    best
}
