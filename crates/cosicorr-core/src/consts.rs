/// Default window size (pixels) for base and target windows, both axes.
pub const DEFAULT_WINDOW_SIZE: usize = 64;

/// Default grid step (pixels) along rows and columns.
pub const DEFAULT_STEP: usize = 8;

/// Default frequency-mask threshold for the frequency correlator.
pub const DEFAULT_MASK_THRESHOLD: f64 = 0.95;

/// Default number of mask-refinement iterations for the frequency correlator.
pub const DEFAULT_ITERATIONS: usize = 4;

/// Default maximum row/column offset searched by the spatial correlator.
pub const DEFAULT_SEARCH_RANGE: usize = 10;

/// Minimum frequency-correlation score for a result to be accepted. Random,
/// uncorrelated 64x64 windows score around 0.16.
pub const FREQUENCY_NOISE_FLOOR: f64 = 0.2;

/// Minimum number of spectral components that must survive masking for a
/// phase-plane fit to be run.
pub const MIN_MASKED_COMPONENTS: usize = 8;

/// Phase-plane refinement stops once its correction is shorter than this (pixels).
pub const CONVERGENCE_TOLERANCE: f64 = 1e-3;

/// Phase-plane refinement gives up once the estimate moves further than this
/// from the coarse peak along either axis (pixels).
pub const MAX_PHASE_FIT_DRIFT: f64 = 1.0;

/// Variance below which a patch is treated as flat (no texture).
pub const VARIANCE_EPSILON: f64 = 1e-12;

/// Magnitude below which a cross-power component is treated as zero.
pub const SPECTRUM_EPSILON: f64 = 1e-12;

/// Sub-pixel refinement never moves the peak by more than this (pixels).
pub const MAX_SUBPIXEL_OFFSET: f64 = 0.5;

/// Minimum number of grid cells to use Rayon parallelism.
pub const PARALLEL_CELL_THRESHOLD: usize = 16;
