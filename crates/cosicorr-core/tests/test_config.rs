use cosicorr_core::config::{
    CorrelationConfig, CorrelatorConfig, FrequencyConfig, GridMode, HalfSize, SearchRange,
    SpatialConfig, Step, WindowSize,
};
use cosicorr_core::correlate::CellStatus;
use cosicorr_core::error::CorrelationError;

// ---------------------------------------------------------------------------
// Defaults and Display
// ---------------------------------------------------------------------------

#[test]
fn test_default_config_is_frequency() {
    let config = CorrelationConfig::default();
    assert_eq!(config.correlator.method_name(), "frequency");
    assert_eq!(config.step, Step { row: 8, col: 8 });
    assert_eq!(config.grid_mode, GridMode::Regular);
    assert_eq!(*config.correlator.window_size(), WindowSize::uniform(64));
    assert!(config.validate().is_ok());
}

#[test]
fn test_grid_mode_display() {
    assert_eq!(format!("{}", GridMode::Regular), "Regular");
    assert_eq!(format!("{}", GridMode::PixelWise), "Pixel-wise");
}

#[test]
fn test_correlator_display() {
    let freq = CorrelatorConfig::Frequency(FrequencyConfig::default());
    assert_eq!(format!("{}", freq), "Frequency (mask 0.95, 4 iterations)");
    let spatial = CorrelatorConfig::Spatial(SpatialConfig::default());
    assert_eq!(format!("{}", spatial), "Spatial (search 10x10)");
}

#[test]
fn test_cell_status_display() {
    assert_eq!(format!("{}", CellStatus::NoData), "No data");
    assert_eq!(format!("{}", CellStatus::BelowNoiseFloor), "Below noise floor");
}

// ---------------------------------------------------------------------------
// Window sizes
// ---------------------------------------------------------------------------

#[test]
fn test_window_half_sizes() {
    let ws = WindowSize::from_array([32, 16, 65, 33]);
    assert_eq!(ws.base_half(), HalfSize::new(8, 16));
    assert_eq!(ws.target_half(), HalfSize::new(16, 32));
    assert_eq!(ws.base_half().shape(), (17, 33));
    assert_eq!(ws.to_array(), [32, 16, 65, 33]);
}

#[test]
fn test_spatial_target_extent_covers_search_range() {
    let config = CorrelatorConfig::Spatial(SpatialConfig {
        window_size: WindowSize::from_array([32, 32, 40, 40]),
        search_range: SearchRange { row: 2, col: 10 },
    });
    // rows: max(20, 16 + 2), cols: max(20, 16 + 10)
    assert_eq!(config.target_extent(), HalfSize::new(20, 26));
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn is_config_error(config: &CorrelationConfig) -> bool {
    matches!(config.validate(), Err(CorrelationError::Configuration { .. }))
}

#[test]
fn test_tiny_window_rejected() {
    let config = CorrelationConfig::frequency(FrequencyConfig {
        window_size: WindowSize::from_array([3, 32, 32, 32]),
        ..Default::default()
    });
    assert!(is_config_error(&config));
}

#[test]
fn test_target_smaller_than_base_rejected() {
    let config = CorrelationConfig::spatial(SpatialConfig {
        window_size: WindowSize::from_array([32, 32, 16, 32]),
        ..Default::default()
    });
    assert!(is_config_error(&config));
}

#[test]
fn test_zero_step_rejected_unless_pixel_based() {
    let mut config = CorrelationConfig::default().with_step(0, 8);
    assert!(is_config_error(&config));
    config.pixel_based = true;
    assert!(config.validate().is_ok());
    assert_eq!(config.effective_step(), Step { row: 1, col: 1 });
    assert_eq!(config.effective_grid_mode(), GridMode::PixelWise);
}

#[test]
fn test_mask_threshold_range() {
    for (mask, ok) in [(0.0, false), (0.5, true), (1.0, true), (1.01, false), (f64::NAN, false)] {
        let config = CorrelationConfig::frequency(FrequencyConfig {
            mask_threshold: mask,
            ..Default::default()
        });
        assert_eq!(config.validate().is_ok(), ok, "mask_threshold {}", mask);
    }
}

#[test]
fn test_zero_iterations_rejected() {
    let config = CorrelationConfig::frequency(FrequencyConfig {
        iterations: 0,
        ..Default::default()
    });
    assert!(is_config_error(&config));
}

// ---------------------------------------------------------------------------
// TOML
// ---------------------------------------------------------------------------

#[test]
fn test_toml_roundtrip() {
    let mut config = CorrelationConfig::spatial(SpatialConfig {
        window_size: WindowSize::from_array([32, 32, 48, 48]),
        search_range: SearchRange { row: 4, col: 6 },
    })
    .with_step(4, 4);
    config.align_to_ground = true;

    let text = toml::to_string_pretty(&config).unwrap();
    let parsed: CorrelationConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_toml_minimal_file() {
    let text = r#"
pixel_based = true

[correlator.Spatial.search_range]
row = 3
col = 5
"#;
    let config: CorrelationConfig = toml::from_str(text).unwrap();
    assert!(config.pixel_based);
    assert_eq!(config.step, Step::default());
    match config.correlator {
        CorrelatorConfig::Spatial(p) => {
            assert_eq!(p.search_range, SearchRange { row: 3, col: 5 });
            assert_eq!(p.window_size, WindowSize::default());
        }
        other => panic!("expected spatial correlator, got {:?}", other),
    }
}
