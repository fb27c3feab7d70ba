use std::path::Path;

use console::Style;
use cosicorr_core::batch::BandSource;
use cosicorr_core::config::{CorrelationConfig, CorrelatorConfig, GridMode};
use cosicorr_core::engine::DisplacementField;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    warn: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            warn: Style::new().yellow().bold(),
        }
    }
}

pub fn print_correlation_summary(
    config: &CorrelationConfig,
    base: &BandSource,
    target: &BandSource,
    output: &Path,
) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Correlation"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(11)));
    println!();

    println!("  {:<14}{}", s.label.apply_to("Base"), s.path.apply_to(base));
    println!("  {:<14}{}", s.label.apply_to("Target"), s.path.apply_to(target));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(output.display())
    );
    println!();

    // Correlator
    println!("  {}", s.header.apply_to("Correlator"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Method"),
        s.method.apply_to(config.correlator.method_name())
    );
    let [bw, bh, tw, th] = config.correlator.window_size().to_array();
    println!(
        "    {:<12}{}",
        s.label.apply_to("Window"),
        s.value.apply_to(format!("base {bw}x{bh}, target {tw}x{th}"))
    );
    match &config.correlator {
        CorrelatorConfig::Frequency(p) => {
            println!(
                "    {:<12}{}",
                s.label.apply_to("Mask"),
                s.value.apply_to(p.mask_threshold)
            );
            println!(
                "    {:<12}{}",
                s.label.apply_to("Iterations"),
                s.value.apply_to(p.iterations)
            );
        }
        CorrelatorConfig::Spatial(p) => {
            println!(
                "    {:<12}{}",
                s.label.apply_to("Search"),
                s.value.apply_to(format!(
                    "\u{00b1}{} rows, \u{00b1}{} cols",
                    p.search_range.row, p.search_range.col
                ))
            );
        }
    }
    println!();

    // Grid
    println!("  {}", s.header.apply_to("Grid"));
    let mode = config.effective_grid_mode();
    println!(
        "    {:<12}{}",
        s.label.apply_to("Mode"),
        s.method.apply_to(mode)
    );
    if mode == GridMode::Regular {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Step"),
            s.value
                .apply_to(format!("{} x {} px", config.step.row, config.step.col))
        );
        if config.align_to_ground {
            println!(
                "    {:<12}{}",
                s.label.apply_to("Alignment"),
                s.value.apply_to("ground")
            );
        } else {
            println!(
                "    {:<12}{}",
                s.label.apply_to("Alignment"),
                s.disabled.apply_to("none")
            );
        }
    }
    println!();
}

pub fn print_field_summary(field: &DisplacementField) {
    let s = Styles::new();
    let meta = &field.metadata;
    let (rows, cols) = meta.grid_shape;

    println!();
    println!("  {}", s.header.apply_to("Result"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Grid"),
        s.value.apply_to(format!("{rows} x {cols}"))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Valid"),
        s.value
            .apply_to(format!("{} / {}", meta.valid_cells, meta.total_cells()))
    );
    for (status, count) in field.status_counts() {
        println!("      {:<16}{}", s.label.apply_to(status), count);
    }
    if meta.method == "frequency" && meta.valid_cells > 0 {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Iterations"),
            s.value.apply_to(format!("{:.2} mean", meta.mean_iterations))
        );
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Elapsed"),
        s.value.apply_to(format!("{:.2?}", meta.elapsed))
    );
    if meta.cancelled {
        println!("    {}", s.warn.apply_to("cancelled, field is partial"));
    }
    println!();
}
