use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_ITERATIONS, DEFAULT_MASK_THRESHOLD, DEFAULT_SEARCH_RANGE, DEFAULT_STEP,
    DEFAULT_WINDOW_SIZE,
};
use crate::error::{CorrelationError, Result};

/// Smallest window extent (pixels) accepted on either axis.
pub const MIN_WINDOW_SIZE: usize = 4;

/// Full window extents for the base and target images.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub base_width: usize,
    pub base_height: usize,
    pub target_width: usize,
    pub target_height: usize,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::uniform(DEFAULT_WINDOW_SIZE)
    }
}

impl WindowSize {
    pub fn uniform(size: usize) -> Self {
        Self {
            base_width: size,
            base_height: size,
            target_width: size,
            target_height: size,
        }
    }

    /// Build from `[base_w, base_h, target_w, target_h]`.
    pub fn from_array(values: [usize; 4]) -> Self {
        Self {
            base_width: values[0],
            base_height: values[1],
            target_width: values[2],
            target_height: values[3],
        }
    }

    pub fn to_array(&self) -> [usize; 4] {
        [
            self.base_width,
            self.base_height,
            self.target_width,
            self.target_height,
        ]
    }

    pub fn base_half(&self) -> HalfSize {
        HalfSize::new(self.base_height / 2, self.base_width / 2)
    }

    pub fn target_half(&self) -> HalfSize {
        HalfSize::new(self.target_height / 2, self.target_width / 2)
    }

    fn validate(&self) -> Result<()> {
        let dims = self.to_array();
        if dims.iter().any(|&d| d < MIN_WINDOW_SIZE) {
            return Err(CorrelationError::config(format!(
                "window_size {:?}: every extent must be at least {} pixels",
                dims, MIN_WINDOW_SIZE
            )));
        }
        if self.target_width < self.base_width || self.target_height < self.base_height {
            return Err(CorrelationError::config(format!(
                "window_size {:?}: target window must be at least as large as the base window",
                dims
            )));
        }
        Ok(())
    }
}

/// Half extents of a window. A window with half-size (r, c) spans
/// `2r + 1` rows and `2c + 1` columns around its center.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalfSize {
    pub rows: usize,
    pub cols: usize,
}

impl HalfSize {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Full (rows, cols) shape of the window.
    pub fn shape(&self) -> (usize, usize) {
        (2 * self.rows + 1, 2 * self.cols + 1)
    }

    /// Per-axis maximum of two half-sizes.
    pub fn max(self, other: HalfSize) -> HalfSize {
        HalfSize::new(self.rows.max(other.rows), self.cols.max(other.cols))
    }
}

/// Grid step along rows and columns (pixels).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub row: usize,
    pub col: usize,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            row: DEFAULT_STEP,
            col: DEFAULT_STEP,
        }
    }
}

/// Maximum integer offset searched along rows and columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRange {
    pub row: usize,
    pub col: usize,
}

impl Default for SearchRange {
    fn default() -> Self {
        Self {
            row: DEFAULT_SEARCH_RANGE,
            col: DEFAULT_SEARCH_RANGE,
        }
    }
}

/// How sampling centers are laid out over the base image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridMode {
    /// Centers every `step` pixels.
    #[default]
    Regular,
    /// Every interior pixel is a center.
    PixelWise,
}

impl std::fmt::Display for GridMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regular => write!(f, "Regular"),
            Self::PixelWise => write!(f, "Pixel-wise"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrequencyConfig {
    #[serde(default)]
    pub window_size: WindowSize,
    /// Spectral components whose normalized magnitude is below this are
    /// masked during refinement. Must lie in (0, 1].
    pub mask_threshold: f64,
    /// Maximum number of mask-refinement iterations (>= 1).
    pub iterations: usize,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            window_size: WindowSize::default(),
            mask_threshold: DEFAULT_MASK_THRESHOLD,
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialConfig {
    #[serde(default)]
    pub window_size: WindowSize,
    #[serde(default)]
    pub search_range: SearchRange,
}

/// Correlation method together with its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CorrelatorConfig {
    Frequency(FrequencyConfig),
    Spatial(SpatialConfig),
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self::Frequency(FrequencyConfig::default())
    }
}

impl std::fmt::Display for CorrelatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Frequency(p) => write!(
                f,
                "Frequency (mask {}, {} iterations)",
                p.mask_threshold, p.iterations
            ),
            Self::Spatial(p) => write!(
                f,
                "Spatial (search {}x{})",
                p.search_range.row, p.search_range.col
            ),
        }
    }
}

impl CorrelatorConfig {
    /// Short method name used in output file names.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Frequency(_) => "frequency",
            Self::Spatial(_) => "spatial",
        }
    }

    pub fn window_size(&self) -> &WindowSize {
        match self {
            Self::Frequency(p) => &p.window_size,
            Self::Spatial(p) => &p.window_size,
        }
    }

    /// Half-size of the region that must be read from the target image
    /// around each center.
    pub fn target_extent(&self) -> HalfSize {
        match self {
            Self::Frequency(p) => p.window_size.target_half(),
            Self::Spatial(p) => {
                let base = p.window_size.base_half();
                let searched = HalfSize::new(
                    base.rows + p.search_range.row,
                    base.cols + p.search_range.col,
                );
                p.window_size.target_half().max(searched)
            }
        }
    }
}

/// Complete, immutable parameter set for one correlation call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Forces pixel-wise sampling regardless of `grid_mode` and `step`.
    #[serde(default)]
    pub pixel_based: bool,
    /// Snap regular-grid centers to multiples of the step in ground coordinates.
    #[serde(default)]
    pub align_to_ground: bool,
    #[serde(default)]
    pub grid_mode: GridMode,
    #[serde(default)]
    pub step: Step,
    pub correlator: CorrelatorConfig,
}

impl CorrelationConfig {
    pub fn frequency(params: FrequencyConfig) -> Self {
        Self {
            correlator: CorrelatorConfig::Frequency(params),
            ..Default::default()
        }
    }

    pub fn spatial(params: SpatialConfig) -> Self {
        Self {
            correlator: CorrelatorConfig::Spatial(params),
            ..Default::default()
        }
    }

    pub fn with_step(mut self, row: usize, col: usize) -> Self {
        self.step = Step { row, col };
        self
    }

    /// Grid mode after applying the `pixel_based` override.
    pub fn effective_grid_mode(&self) -> GridMode {
        if self.pixel_based {
            GridMode::PixelWise
        } else {
            self.grid_mode
        }
    }

    /// Step actually used between centers (1 in pixel-wise mode).
    pub fn effective_step(&self) -> Step {
        match self.effective_grid_mode() {
            GridMode::Regular => self.step,
            GridMode::PixelWise => Step { row: 1, col: 1 },
        }
    }

    /// Check every parameter constraint that does not depend on image size.
    pub fn validate(&self) -> Result<()> {
        self.correlator.window_size().validate()?;

        if self.effective_grid_mode() == GridMode::Regular && (self.step.row == 0 || self.step.col == 0)
        {
            return Err(CorrelationError::config(format!(
                "step [{}, {}]: both components must be at least 1",
                self.step.row, self.step.col
            )));
        }

        if let CorrelatorConfig::Frequency(p) = &self.correlator {
            if !(p.mask_threshold > 0.0 && p.mask_threshold <= 1.0) {
                return Err(CorrelationError::config(format!(
                    "mask_threshold {} must lie in (0, 1]",
                    p.mask_threshold
                )));
            }
            if p.iterations == 0 {
                return Err(CorrelationError::config(
                    "iterations must be at least 1",
                ));
            }
        }

        Ok(())
    }
}
