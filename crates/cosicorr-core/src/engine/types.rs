use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ndarray::Array2;

use crate::correlate::CellStatus;
use crate::raster::GeoTransform;

/// Cooperative cancellation flag shared between a caller and a running
/// correlation. Checked before every grid cell.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-call summary attached to every displacement field.
#[derive(Clone, Debug)]
pub struct CorrelationMetadata {
    pub method: &'static str,
    /// (rows, cols) of the sampling grid.
    pub grid_shape: (usize, usize),
    pub valid_cells: usize,
    pub elapsed: Duration,
    /// Mean number of refinement iterations over valid cells (frequency only).
    pub mean_iterations: f64,
    /// True when the call was cancelled; uncomputed cells are `Cancelled`.
    pub cancelled: bool,
}

impl CorrelationMetadata {
    pub fn total_cells(&self) -> usize {
        self.grid_shape.0 * self.grid_shape.1
    }
}

/// Dense displacement field: three parallel layers shaped like the sampling grid.
#[derive(Clone, Debug)]
pub struct DisplacementField {
    /// East-west displacement (columns), target - base, in pixels.
    pub dx: Array2<f64>,
    /// North-south displacement (rows), target - base, in pixels.
    pub dy: Array2<f64>,
    /// Correlation quality per cell (0 for invalid cells).
    pub score: Array2<f64>,
    pub status: Array2<CellStatus>,
    /// Base-image row of each grid row.
    pub row_centers: Vec<usize>,
    /// Base-image column of each grid column.
    pub col_centers: Vec<usize>,
    /// Base geotransform scaled by the sampling step.
    pub geotransform: GeoTransform,
    pub metadata: CorrelationMetadata,
}

impl DisplacementField {
    pub fn shape(&self) -> (usize, usize) {
        self.dx.dim()
    }

    pub fn valid_count(&self) -> usize {
        self.metadata.valid_cells
    }

    /// The three output layers with their band names.
    pub fn layers(&self) -> [(&'static str, &Array2<f64>); 3] {
        [("dx", &self.dx), ("dy", &self.dy), ("score", &self.score)]
    }

    /// Number of cells per status, ordered by status.
    pub fn status_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for status in self.status.iter() {
            *counts.entry(status.to_string()).or_insert(0) += 1;
        }
        counts
    }
}
