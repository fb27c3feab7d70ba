//! Input pairing and output naming for multi-pair runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::CorrelationConfig;
use crate::engine::{correlate_with_progress, CancelToken, DisplacementField};
use crate::error::{CorrelationError, Result};
use crate::io::load_band;

/// One band of one raster file (1-based band index).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BandSource {
    pub path: PathBuf,
    pub band: usize,
}

impl BandSource {
    pub fn new(path: impl Into<PathBuf>, band: usize) -> Self {
        Self {
            path: path.into(),
            band,
        }
    }

    /// File name without extension.
    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }
}

impl std::fmt::Display for BandSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (band {})", self.path.display(), self.band)
    }
}

/// How base and target lists are combined into pairs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingPolicy {
    /// i-th base with i-th target.
    Serial,
    /// Every base with every target.
    #[default]
    All,
}

/// A base/target pair scheduled for correlation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationPair {
    pub base: BandSource,
    pub target: BandSource,
}

fn attach_bands(paths: &[PathBuf], bands: Option<&[usize]>, role: &str) -> Result<Vec<BandSource>> {
    match bands {
        None => Ok(paths.iter().map(|p| BandSource::new(p, 1)).collect()),
        Some(bands) if bands.len() != paths.len() => Err(CorrelationError::config(format!(
            "{} band list has {} entries for {} images",
            role,
            bands.len(),
            paths.len()
        ))),
        Some(bands) => Ok(paths
            .iter()
            .zip(bands)
            .map(|(p, &b)| BandSource::new(p, b))
            .collect()),
    }
}

/// Combine base and target images into correlation pairs.
///
/// Without explicit band lists every image contributes band 1.
pub fn pair_inputs(
    bases: &[PathBuf],
    targets: &[PathBuf],
    base_bands: Option<&[usize]>,
    target_bands: Option<&[usize]>,
    policy: PairingPolicy,
) -> Result<Vec<CorrelationPair>> {
    if bases.is_empty() || targets.is_empty() {
        return Err(CorrelationError::config(
            "at least one base and one target image are required",
        ));
    }
    let bases = attach_bands(bases, base_bands, "base")?;
    let targets = attach_bands(targets, target_bands, "target")?;

    match policy {
        PairingPolicy::Serial => {
            if bases.len() != targets.len() {
                return Err(CorrelationError::config(format!(
                    "serial pairing needs equal image counts, got {} base and {} target",
                    bases.len(),
                    targets.len()
                )));
            }
            Ok(bases
                .into_iter()
                .zip(targets)
                .map(|(base, target)| CorrelationPair { base, target })
                .collect())
        }
        PairingPolicy::All => Ok(bases
            .iter()
            .flat_map(|base| {
                targets.iter().map(move |target| CorrelationPair {
                    base: base.clone(),
                    target: target.clone(),
                })
            })
            .collect()),
    }
}

/// Band pairs for a multiband run.
///
/// `combinations` is a `;`-separated list of `base,target` pairs such as
/// `"1,2;3,4"`. Without it every ordered pair `(i, j)` with `i < j` is used.
pub fn band_combinations(num_bands: usize, combinations: Option<&str>) -> Result<Vec<(usize, usize)>> {
    if num_bands < 2 {
        return Err(CorrelationError::config(format!(
            "multiband correlation needs at least 2 bands, image has {}",
            num_bands
        )));
    }

    let Some(text) = combinations else {
        return Ok((1..=num_bands)
            .flat_map(|i| (i + 1..=num_bands).map(move |j| (i, j)))
            .collect());
    };

    let mut pairs = Vec::new();
    for group in text.split(';').map(str::trim).filter(|g| !g.is_empty()) {
        let bands: Vec<usize> = group
            .split(',')
            .map(|v| v.trim().parse::<usize>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| CorrelationError::config(format!("invalid band pair '{}'", group)))?;
        let &[base, target] = bands.as_slice() else {
            return Err(CorrelationError::config(format!(
                "band pair '{}' must name exactly two bands",
                group
            )));
        };
        if let Some(bad) = [base, target].into_iter().find(|&b| b == 0 || b > num_bands) {
            return Err(CorrelationError::config(format!(
                "band {} in '{}' is outside 1..={}",
                bad, group, num_bands
            )));
        }
        pairs.push((base, target));
    }

    if pairs.is_empty() {
        return Err(CorrelationError::config("no band combinations given"));
    }
    Ok(pairs)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "raster".to_string())
}

/// `<base>_VS_<target>_<method>_wz_<bw>_<bh>_<tw>_<th>_step_<r>_<c>.tif`
pub fn default_output_name(base: &Path, target: &Path, config: &CorrelationConfig) -> String {
    let [bw, bh, tw, th] = config.correlator.window_size().to_array();
    let step = config.effective_step();
    format!(
        "{}_VS_{}_{}_wz_{}_{}_{}_{}_step_{}_{}.tif",
        file_stem(base),
        file_stem(target),
        config.correlator.method_name(),
        bw,
        bh,
        tw,
        th,
        step.row,
        step.col
    )
}

/// Use `output` as-is unless it is a directory, in which case the default
/// name is placed inside it.
pub fn resolve_output_path(
    output: &Path,
    base: &Path,
    target: &Path,
    config: &CorrelationConfig,
) -> PathBuf {
    if output.is_dir() {
        output.join(default_output_name(base, target, config))
    } else {
        output.to_path_buf()
    }
}

/// `corr_<stem>_bands_<b>_<t>.tif` inside `dir`.
pub fn multiband_output_path(dir: &Path, image: &Path, base_band: usize, target_band: usize) -> PathBuf {
    dir.join(format!(
        "corr_{}_bands_{}_{}.tif",
        file_stem(image),
        base_band,
        target_band
    ))
}

/// Load both bands of a pair and correlate them.
pub fn correlate_pair<F>(
    pair: &CorrelationPair,
    config: &CorrelationConfig,
    cancel: &CancelToken,
    on_cell_done: F,
) -> Result<DisplacementField>
where
    F: Fn(usize) + Send + Sync,
{
    info!(base = %pair.base, target = %pair.target, "Correlating pair");
    let base = load_band(&pair.base.path, pair.base.band)?;
    let target = load_band(&pair.target.path, pair.target.band)?;
    correlate_with_progress(&base, &target, config, cancel, on_cell_done)
}
