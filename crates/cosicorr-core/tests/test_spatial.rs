mod common;

use approx::assert_abs_diff_eq;
use cosicorr_core::config::{SearchRange, SpatialConfig, WindowSize};
use cosicorr_core::correlate::{CellStatus, SpatialCorrelator};
use ndarray::{s, Array2};

fn correlator(size: usize, range: usize) -> SpatialCorrelator {
    SpatialCorrelator::new(SpatialConfig {
        window_size: WindowSize::uniform(size),
        search_range: SearchRange {
            row: range,
            col: range,
        },
    })
}

#[test]
fn test_identical_patches_have_zero_shift() {
    let band = common::noise(60, 60, 3);
    let base = band.slice(s![20..41, 20..41]);
    let target = band.slice(s![15..46, 15..46]);
    let result = correlator(20, 5).correlate(base, target);

    assert_eq!(result.status, CellStatus::Valid);
    assert_abs_diff_eq!(result.dx, 0.0, epsilon = 0.05);
    assert_abs_diff_eq!(result.dy, 0.0, epsilon = 0.05);
    assert!(result.score > 0.99);
}

#[test]
fn test_shift_within_range_is_recovered() {
    let (base, target) = common::shifted_pair(80, 80, -4, 3);
    // 21x21 base patch, 41x41 search region around the same center
    let result = correlator(20, 10).correlate(
        base.data.slice(s![30..51, 30..51]),
        target.data.slice(s![20..61, 20..61]),
    );

    assert_eq!(result.status, CellStatus::Valid);
    assert!((result.dx - 3.0).abs() < 0.1, "dx={} should be ~3", result.dx);
    assert!((result.dy + 4.0).abs() < 0.1, "dy={} should be ~-4", result.dy);
}

#[test]
fn test_range_is_limited_by_search_region() {
    let (base, target) = common::shifted_pair(80, 80, 0, 2);
    // Region only leaves room for +/-2 offsets even though range is 10
    let result = correlator(20, 10).correlate(
        base.data.slice(s![30..51, 30..51]),
        target.data.slice(s![28..53, 28..53]),
    );
    assert_eq!(result.status, CellStatus::Valid);
    assert!((result.dx - 2.0).abs() < 0.1, "dx={}", result.dx);
    assert!(result.dy.abs() < 0.1, "dy={}", result.dy);
}

#[test]
fn test_periodic_pattern_ties_resolve_to_smallest_offset() {
    // Period-4 stripes along columns: offsets 0 and +/-4 correlate equally
    let stripes = Array2::from_shape_fn((40, 40), |(r, c)| ((c % 4) as f64) + 0.1 * ((r % 3) as f64));
    let base = stripes.slice(s![10..31, 10..31]);
    let target = stripes.slice(s![5..36, 5..36]);

    let first = correlator(20, 5).correlate(base, target);
    let second = correlator(20, 5).correlate(base, target);

    assert_eq!(first.status, CellStatus::Valid);
    assert!(first.dx.abs() < 0.5, "dx={} should stay on the zero offset", first.dx);
    assert!(first.dy.abs() < 0.5, "dy={} should stay on the zero offset", first.dy);
    assert_eq!(first, second);
}

#[test]
fn test_flat_base_is_degenerate() {
    let flat = Array2::from_elem((21, 21), 2.0);
    let target = common::noise(31, 31, 4);
    let result = correlator(20, 5).correlate(flat.view(), target.view());
    assert_eq!(result.status, CellStatus::Degenerate);
    assert!(result.dx.is_nan());
}

#[test]
fn test_flat_target_is_degenerate() {
    let base = common::noise(21, 21, 5);
    let flat = Array2::from_elem((31, 31), 2.0);
    let result = correlator(20, 5).correlate(base.view(), flat.view());
    assert_eq!(result.status, CellStatus::Degenerate);
}

#[test]
fn test_subpixel_shift_is_recovered() {
    // Parabola refinement on a smooth texture stays within a tenth of a pixel
    for (dy, dx) in [(0.25, -0.25), (-0.4, 0.3), (1.6, -2.3)] {
        let (base, target) = common::subpixel_pair(97, dy, dx, 1.5);
        let result = correlator(32, 5).correlate(
            base.slice(s![32..65, 32..65]),
            target.slice(s![27..70, 27..70]),
        );

        assert_eq!(result.status, CellStatus::Valid, "shift ({dy}, {dx})");
        assert!((result.dy - dy).abs() < 0.1, "dy={} should be ~{dy}", result.dy);
        assert!((result.dx - dx).abs() < 0.1, "dx={} should be ~{dx}", result.dx);
    }
}
