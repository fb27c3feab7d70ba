mod types;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::CorrelationConfig;
use crate::consts::PARALLEL_CELL_THRESHOLD;
use crate::correlate::{CellResult, CellStatus, Correlator};
use crate::error::Result;
use crate::grid::{build_grid, GridParams, SamplingGrid};
use crate::raster::RasterBand;
use crate::window::extract_window;

pub use types::{CancelToken, CorrelationMetadata, DisplacementField};

/// Correlate two bands with the given configuration.
pub fn correlate(
    base: &RasterBand,
    target: &RasterBand,
    config: &CorrelationConfig,
) -> Result<DisplacementField> {
    correlate_with_progress(base, target, config, &CancelToken::new(), |_| {})
}

/// Correlate two bands, reporting the number of finished cells through
/// `on_cell_done` and honouring `cancel` between cells.
///
/// Configuration and empty-grid errors abort before any cell is evaluated.
/// Per-cell failures become invalid cells. A cancelled call still returns a
/// well-formed field whose unevaluated cells are marked `Cancelled`.
pub fn correlate_with_progress<F>(
    base: &RasterBand,
    target: &RasterBand,
    config: &CorrelationConfig,
    cancel: &CancelToken,
    on_cell_done: F,
) -> Result<DisplacementField>
where
    F: Fn(usize) + Send + Sync,
{
    let grid = plan_grid(base, target, config)?;
    let (rows, cols) = grid.shape();
    info!(
        rows,
        cols,
        admissible = grid.valid_count(),
        "Sampling grid built"
    );

    let correlator = Correlator::from_config(&config.correlator);
    let started = Instant::now();
    let counter = AtomicUsize::new(0);

    let evaluate = |index: usize| -> Result<CellResult> {
        let result = evaluate_cell(&grid, index, base, target, &correlator, cancel);
        let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
        on_cell_done(done);
        result
    };

    let results: Vec<Result<CellResult>> = if grid.len() >= PARALLEL_CELL_THRESHOLD {
        (0..grid.len()).into_par_iter().map(evaluate).collect()
    } else {
        (0..grid.len()).map(evaluate).collect()
    };
    let cells = results.into_iter().collect::<Result<Vec<CellResult>>>()?;

    let field = assemble(&grid, cells, base, config, started);

    if field.metadata.cancelled {
        warn!(
            valid = field.metadata.valid_cells,
            total = field.metadata.total_cells(),
            "Correlation cancelled; returning partial field"
        );
    } else if field.metadata.valid_cells == 0 {
        warn!(total = field.metadata.total_cells(), "Correlation produced no valid cells");
    }
    info!(
        valid = field.metadata.valid_cells,
        total = field.metadata.total_cells(),
        elapsed_ms = field.metadata.elapsed.as_millis() as u64,
        "Correlation complete"
    );

    Ok(field)
}

/// Validate `config` and build the sampling grid a correlation of these
/// bands would evaluate.
pub fn plan_grid(
    base: &RasterBand,
    target: &RasterBand,
    config: &CorrelationConfig,
) -> Result<SamplingGrid> {
    config.validate()?;

    let params = GridParams::from_config(config, &base.geotransform);
    debug!(
        method = config.correlator.method_name(),
        mode = %params.mode,
        base_half = ?params.base_half,
        target_half = ?params.target_half,
        "Resolved correlation parameters"
    );

    build_grid(base.dim(), target.dim(), &params)
}

fn evaluate_cell(
    grid: &SamplingGrid,
    index: usize,
    base: &RasterBand,
    target: &RasterBand,
    correlator: &Correlator,
    cancel: &CancelToken,
) -> Result<CellResult> {
    if cancel.is_cancelled() {
        return Ok(CellResult::invalid(CellStatus::Cancelled));
    }
    if !grid.is_valid(index) {
        return Ok(CellResult::invalid(CellStatus::OutOfBounds));
    }

    // The grid guarantees both windows fit; a failure here is an invariant
    // violation and aborts the call.
    let center = grid.center(index);
    let base_window = extract_window(base, center, grid.base_half)?;
    let target_window = extract_window(target, center, grid.target_half)?;

    if !base_window.is_complete() || !target_window.is_complete() {
        return Ok(CellResult::invalid(CellStatus::NoData));
    }

    Ok(correlator.correlate(base_window.data, target_window.data))
}

fn assemble(
    grid: &SamplingGrid,
    cells: Vec<CellResult>,
    base: &RasterBand,
    config: &CorrelationConfig,
    started: Instant,
) -> DisplacementField {
    let shape = grid.shape();
    let layer = |f: fn(&CellResult) -> f64| {
        Array2::from_shape_fn(shape, |(i, j)| f(&cells[i * shape.1 + j]))
    };

    let dx = layer(|c| c.dx);
    let dy = layer(|c| c.dy);
    let score = layer(|c| c.score);
    let status = Array2::from_shape_fn(shape, |(i, j)| cells[i * shape.1 + j].status);

    let cancelled = cells.iter().any(|c| c.status == CellStatus::Cancelled);
    let valid: Vec<&CellResult> = cells.iter().filter(|c| c.is_valid()).collect();
    let mean_iterations = if valid.is_empty() {
        0.0
    } else {
        valid.iter().map(|c| c.iterations as f64).sum::<f64>() / valid.len() as f64
    };

    DisplacementField {
        dx,
        dy,
        score,
        status,
        row_centers: grid.row_centers.clone(),
        col_centers: grid.col_centers.clone(),
        geotransform: grid.output_geotransform(&base.geotransform),
        metadata: CorrelationMetadata {
            method: config.correlator.method_name(),
            grid_shape: shape,
            valid_cells: valid.len(),
            elapsed: started.elapsed(),
            mean_iterations,
            cancelled,
        },
    }
}
