mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use cosicorr_core::config::{
    CorrelationConfig, CorrelatorConfig, FrequencyConfig, SearchRange, SpatialConfig, WindowSize,
};
use cosicorr_core::correlate::CellStatus;
use cosicorr_core::engine::{correlate, correlate_with_progress, plan_grid, CancelToken};
use cosicorr_core::error::CorrelationError;
use cosicorr_core::raster::{GeoTransform, RasterBand};

fn frequency(size: usize, step: usize) -> CorrelationConfig {
    CorrelationConfig::frequency(FrequencyConfig {
        window_size: WindowSize::uniform(size),
        ..Default::default()
    })
    .with_step(step, step)
}

fn spatial(size: usize, range: usize, step: usize) -> CorrelationConfig {
    CorrelationConfig::spatial(SpatialConfig {
        window_size: WindowSize::uniform(size),
        search_range: SearchRange {
            row: range,
            col: range,
        },
    })
    .with_step(step, step)
}

#[test]
fn test_frequency_recovers_uniform_shift() {
    let (base, target) = common::shifted_pair(100, 100, 2, -3);
    let field = correlate(&base, &target, &frequency(32, 8)).unwrap();

    assert_eq!(field.shape(), (9, 9));
    assert_eq!(field.metadata.grid_shape, (9, 9));
    assert!(field.valid_count() > 0);
    for ((idx, &status), (&dx, &dy)) in field
        .status
        .indexed_iter()
        .zip(field.dx.iter().zip(field.dy.iter()))
    {
        if status == CellStatus::Valid {
            assert!((dx + 3.0).abs() < 0.1, "cell {:?}: dx={}", idx, dx);
            assert!((dy - 2.0).abs() < 0.1, "cell {:?}: dy={}", idx, dy);
            assert!(field.score[idx] >= 0.2 && field.score[idx] <= 1.0);
        }
    }
}

#[test]
fn test_spatial_recovers_uniform_shift() {
    let (base, target) = common::shifted_pair(100, 100, 2, -3);
    let field = correlate(&base, &target, &spatial(32, 10, 8)).unwrap();

    assert_eq!(field.shape(), (9, 9));
    // Search region half-size 26 only fits around centers 32..=72
    assert_eq!(field.valid_count(), 36);
    assert_eq!(field.status[[0, 0]], CellStatus::OutOfBounds);
    assert!(field.dx[[0, 0]].is_nan());
    assert_eq!(field.score[[0, 0]], 0.0);

    for ((idx, &status), (&dx, &dy)) in field
        .status
        .indexed_iter()
        .zip(field.dx.iter().zip(field.dy.iter()))
    {
        if status == CellStatus::Valid {
            assert!((dx + 3.0).abs() < 0.1, "cell {:?}: dx={}", idx, dx);
            assert!((dy - 2.0).abs() < 0.1, "cell {:?}: dy={}", idx, dy);
        }
    }
}

#[test]
fn test_identical_images_have_zero_displacement() {
    let band = RasterBand::new(common::noise(64, 64, 9));
    let field = correlate(&band, &band, &frequency(16, 8)).unwrap();

    assert_eq!(field.valid_count(), field.metadata.total_cells());
    assert!(field.dx.iter().all(|v| v.abs() < 1e-6));
    assert!(field.dy.iter().all(|v| v.abs() < 1e-6));
    assert!(field.score.iter().all(|&s| (s - 1.0).abs() < 1e-6));
}

#[test]
fn test_output_shape_matches_grid() {
    let (base, target) = common::shifted_pair(90, 70, 0, 0);
    let config = frequency(20, 6);
    let grid = plan_grid(&base, &target, &config).unwrap();
    let field = correlate(&base, &target, &config).unwrap();

    assert_eq!(field.shape(), grid.shape());
    assert_eq!(field.row_centers, grid.row_centers);
    assert_eq!(field.col_centers, grid.col_centers);
    assert_eq!(field.status.dim(), grid.shape());
    assert_eq!(field.score.dim(), grid.shape());
}

#[test]
fn test_pixel_based_overrides_step() {
    let (base, target) = common::shifted_pair(40, 40, 1, 0);
    let mut config = frequency(8, 8);
    config.pixel_based = true;
    let field = correlate(&base, &target, &config).unwrap();
    assert_eq!(field.shape(), (32, 32));
    assert_eq!(field.geotransform.0[1], 1.0);
}

#[test]
fn test_window_too_large_is_configuration_error() {
    let (base, target) = common::shifted_pair(30, 30, 0, 0);
    let result = correlate(&base, &target, &frequency(32, 8));
    assert!(matches!(result, Err(CorrelationError::Configuration { .. })));
}

#[test]
fn test_invalid_config_is_rejected_before_work() {
    let (base, target) = common::shifted_pair(64, 64, 0, 0);
    let mut config = frequency(16, 8);
    if let CorrelatorConfig::Frequency(ref mut p) = config.correlator {
        p.mask_threshold = 1.5;
    }
    let calls = AtomicUsize::new(0);
    let result = correlate_with_progress(&base, &target, &config, &CancelToken::new(), |_| {
        calls.fetch_add(1, Ordering::Relaxed);
    });
    assert!(matches!(result, Err(CorrelationError::Configuration { .. })));
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

#[test]
fn test_nodata_cells_are_invalid() {
    let (base, target) = common::shifted_pair(100, 100, 0, 0);
    let mut data = base.data.clone();
    data[[50, 50]] = f64::NAN;
    let base = RasterBand::new(data);

    let field = correlate(&base, &target, &frequency(32, 8)).unwrap();
    // Center (48, 48) covers the NaN pixel
    assert_eq!(field.status[[4, 4]], CellStatus::NoData);
    assert!(field.dx[[4, 4]].is_nan());
    assert_eq!(field.status[[0, 0]], CellStatus::Valid);
}

#[test]
fn test_flat_images_produce_degenerate_cells() {
    let band = common::flat(64, 64, 3.0);
    let field = correlate(&band, &band, &spatial(16, 4, 8)).unwrap();
    assert_eq!(field.valid_count(), 0);
    assert!(field
        .status
        .iter()
        .all(|&s| s == CellStatus::Degenerate || s == CellStatus::OutOfBounds));
    assert!(field.score.iter().all(|&s| s == 0.0));
}

#[test]
fn test_progress_reports_every_cell() {
    let (base, target) = common::shifted_pair(64, 64, 0, 0);
    let config = frequency(16, 8);
    let calls = AtomicUsize::new(0);
    let highest = AtomicUsize::new(0);

    let field = correlate_with_progress(&base, &target, &config, &CancelToken::new(), |done| {
        calls.fetch_add(1, Ordering::Relaxed);
        highest.fetch_max(done, Ordering::Relaxed);
    })
    .unwrap();

    let total = field.metadata.total_cells();
    assert_eq!(calls.load(Ordering::Relaxed), total);
    assert_eq!(highest.load(Ordering::Relaxed), total);
}

#[test]
fn test_pre_cancelled_call_returns_cancelled_field() {
    let (base, target) = common::shifted_pair(64, 64, 0, 0);
    let cancel = CancelToken::new();
    cancel.cancel();

    let field = correlate_with_progress(&base, &target, &frequency(16, 8), &cancel, |_| {}).unwrap();
    assert!(field.metadata.cancelled);
    assert_eq!(field.valid_count(), 0);
    assert!(field.status.iter().all(|&s| s == CellStatus::Cancelled));
    assert!(field.dx.iter().all(|v| v.is_nan()));
}

#[test]
fn test_cancel_during_run_keeps_field_well_formed() {
    let (base, target) = common::shifted_pair(100, 100, 0, 0);
    let config = frequency(16, 4);
    let cancel = CancelToken::new();
    let trigger = cancel.clone();

    let field = correlate_with_progress(&base, &target, &config, &cancel, |done| {
        if done == 1 {
            trigger.cancel();
        }
    })
    .unwrap();

    let grid = plan_grid(&base, &target, &config).unwrap();
    assert_eq!(field.shape(), grid.shape());
    assert!(field
        .status
        .iter()
        .all(|&s| s == CellStatus::Valid || s == CellStatus::Cancelled));
    let any_cancelled = field.status.iter().any(|&s| s == CellStatus::Cancelled);
    assert_eq!(field.metadata.cancelled, any_cancelled);
}

#[test]
fn test_output_geotransform_follows_base() {
    let (base, target) = common::shifted_pair(100, 100, 0, 0);
    let base = base.with_geotransform(GeoTransform([500.0, 0.5, 0.0, 900.0, 0.0, -0.5]));
    let field = correlate(&base, &target, &frequency(32, 8)).unwrap();
    assert_eq!(field.geotransform.0, [508.0, 4.0, 0.0, 892.0, 0.0, -4.0]);
}

#[test]
fn test_metadata_records_method_and_iterations() {
    let (base, target) = common::shifted_pair(64, 64, 1, -1);
    let field = correlate(&base, &target, &frequency(16, 8)).unwrap();
    assert_eq!(field.metadata.method, "frequency");
    assert!(field.metadata.mean_iterations >= 1.0);
    assert!(field.metadata.mean_iterations <= 4.0);

    let field = correlate(&base, &target, &spatial(16, 3, 8)).unwrap();
    assert_eq!(field.metadata.method, "spatial");
    assert_eq!(field.metadata.mean_iterations, 0.0);
}
