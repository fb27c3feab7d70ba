#![allow(dead_code)]

use std::f64::consts::{PI, TAU};

use cosicorr_core::correlate::fft::{signed_frequency, SpectralPlan};
use cosicorr_core::raster::RasterBand;
use ndarray::{s, Array2};
use num_complex::Complex;

/// Deterministic white-noise texture in [0, 1) from a 64-bit LCG.
pub fn noise(height: usize, width: usize, seed: u64) -> Array2<f64> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    Array2::from_shape_fn((height, width), |_| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    })
}

/// Margin kept around the visible area so shifted content never runs out.
const PAD: usize = 16;

/// Base and target bands of `height x width` where every feature of the base
/// appears in the target displaced by `dy` rows and `dx` columns.
pub fn shifted_pair(height: usize, width: usize, dy: isize, dx: isize) -> (RasterBand, RasterBand) {
    assert!(dy.unsigned_abs() <= PAD && dx.unsigned_abs() <= PAD);
    let big = noise(height + 2 * PAD, width + 2 * PAD, 7);

    let base = big.slice(s![PAD..PAD + height, PAD..PAD + width]).to_owned();
    let r0 = (PAD as isize - dy) as usize;
    let c0 = (PAD as isize - dx) as usize;
    let target = big.slice(s![r0..r0 + height, c0..c0 + width]).to_owned();

    (RasterBand::new(base), RasterBand::new(target))
}

/// Square `size x size` base and target textures where the target is the
/// base displaced by a fractional `dy` rows and `dx` columns.
///
/// The displacement is a phase ramp on the spectrum of a periodic noise
/// field, so it is exact at any sub-pixel offset. `blur` is the radius in
/// pixels of the Gaussian low-pass applied to both textures.
pub fn subpixel_pair(size: usize, dy: f64, dx: f64, blur: f64) -> (Array2<f64>, Array2<f64>) {
    assert!(size % 2 == 1, "odd sizes have no ambiguous Nyquist bin");
    let plan = SpectralPlan::new(size, size);
    let spectrum = plan.forward(&noise(size, size, 13));
    let n = size as f64;

    let mut base = spectrum.clone();
    let mut target = spectrum;
    for ((row, col), value) in base.indexed_iter_mut() {
        let fu = signed_frequency(row, size) / n;
        let fv = signed_frequency(col, size) / n;
        let gain = (-2.0 * PI * PI * blur * blur * (fu * fu + fv * fv)).exp();
        *value *= gain;
        target[[row, col]] = *value * Complex::from_polar(1.0, -TAU * (fu * dy + fv * dx));
    }

    (plan.inverse_real(&base), plan.inverse_real(&target))
}

/// Constant-valued band.
pub fn flat(height: usize, width: usize, value: f64) -> RasterBand {
    RasterBand::new(Array2::from_elem((height, width), value))
}
