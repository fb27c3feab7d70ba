pub mod fft;
pub mod frequency;
pub mod spatial;
pub mod subpixel;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::config::CorrelatorConfig;

pub use frequency::FrequencyCorrelator;
pub use spatial::SpatialCorrelator;

/// Outcome class of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellStatus {
    Valid,
    /// The base or target window did not fit inside its image.
    OutOfBounds,
    /// A window contained nodata pixels.
    NoData,
    /// Zero-variance (flat) patch, or no candidate with a defined coefficient.
    Degenerate,
    /// Frequency correlation peak below the noise floor.
    BelowNoiseFloor,
    /// The call was cancelled before this cell was evaluated.
    Cancelled,
}

impl std::fmt::Display for CellStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "Valid"),
            Self::OutOfBounds => write!(f, "Out of bounds"),
            Self::NoData => write!(f, "No data"),
            Self::Degenerate => write!(f, "Degenerate"),
            Self::BelowNoiseFloor => write!(f, "Below noise floor"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Displacement estimate for one window pair.
///
/// `dx`/`dy` are the displacement of the target relative to the base
/// (target - base) in pixels. Invalid cells carry `NaN` displacements and a
/// score of 0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellResult {
    pub dx: f64,
    pub dy: f64,
    pub score: f64,
    pub status: CellStatus,
    /// Refinement iterations run (frequency correlator only).
    pub iterations: usize,
}

impl CellResult {
    pub fn valid(dx: f64, dy: f64, score: f64, iterations: usize) -> Self {
        Self {
            dx,
            dy,
            score,
            status: CellStatus::Valid,
            iterations,
        }
    }

    pub fn invalid(status: CellStatus) -> Self {
        Self {
            dx: f64::NAN,
            dy: f64::NAN,
            score: 0.0,
            status,
            iterations: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == CellStatus::Valid
    }
}

/// Correlator resolved once per call from a [`CorrelatorConfig`].
pub enum Correlator {
    Frequency(FrequencyCorrelator),
    Spatial(SpatialCorrelator),
}

impl Correlator {
    pub fn from_config(config: &CorrelatorConfig) -> Self {
        match config {
            CorrelatorConfig::Frequency(params) => {
                Self::Frequency(FrequencyCorrelator::new(params.clone()))
            }
            CorrelatorConfig::Spatial(params) => {
                Self::Spatial(SpatialCorrelator::new(params.clone()))
            }
        }
    }

    /// Estimate the displacement between a base patch and a target patch.
    pub fn correlate(&self, base: ArrayView2<f64>, target: ArrayView2<f64>) -> CellResult {
        match self {
            Self::Frequency(c) => c.correlate(base, target),
            Self::Spatial(c) => c.correlate(base, target),
        }
    }
}

/// Mean and centered sum of squares of a patch.
pub(crate) fn mean_and_energy(data: ArrayView2<f64>) -> (f64, f64) {
    let n = data.len() as f64;
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let mean = data.sum() / n;
    let energy = data.iter().map(|&v| (v - mean) * (v - mean)).sum();
    (mean, energy)
}
