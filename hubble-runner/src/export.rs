//! Result export — JSON per validator, a run manifest, CSV surface, JSONL decisions.
//!
//! Layout of an output directory:
//!
//! ```text
//! <dir>/manifest.json
//! <dir>/baseline.json
//! <dir>/logo.json
//! <dir>/logo_diagnostic.json   (scenario-local runs only)
//! <dir>/bootstrap.json
//! <dir>/grid_scan.json
//! <dir>/grid_surface.csv
//! <dir>/injection.json
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::grid_scan::SurfacePoint;
use crate::pipeline::{PipelineReport, RunManifest};
use crate::policy::Decision;

// ─── JSON ────────────────────────────────────────────────────────────

pub fn export_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize result to JSON")
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, export_json(value)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

// ─── CSV ─────────────────────────────────────────────────────────────

/// Grid-scan surface as CSV, one row per (d, f) point.
pub fn export_surface_csv(surface: &[SurfacePoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "distance",
        "attribution",
        "merged_mean",
        "merged_sigma",
        "penalty",
        "tension_reference",
        "tension_corrected",
    ])?;
    for p in surface {
        wtr.write_record(&[
            p.distance.to_string(),
            p.attribution.to_string(),
            p.merged_mean.to_string(),
            p.merged_sigma.to_string(),
            p.penalty.to_string(),
            p.tension_reference.to_string(),
            p.tension_corrected.to_string(),
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

// ─── Artifacts ───────────────────────────────────────────────────────

/// Write every result file plus the manifest. Returns the manifest path.
pub fn save_artifacts(report: &PipelineReport, manifest: &RunManifest, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    write_json(dir, "baseline.json", &report.baseline)?;
    write_json(dir, "logo.json", &report.logo)?;
    if let Some(diag) = &report.logo_diagnostic {
        write_json(dir, "logo_diagnostic.json", diag)?;
    }
    write_json(dir, "bootstrap.json", &report.bootstrap)?;
    write_json(dir, "grid_scan.json", &report.grid_scan)?;
    write_json(dir, "injection.json", &report.injection)?;

    let surface = dir.join("grid_surface.csv");
    fs::write(&surface, export_surface_csv(&report.grid_scan.surface)?)
        .with_context(|| format!("failed to write {}", surface.display()))?;

    write_json(dir, "manifest.json", manifest)
}

pub fn load_manifest(dir: &Path) -> Result<RunManifest> {
    let path = dir.join("manifest.json");
    let json = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
}

// ─── Decision log (JSONL) ────────────────────────────────────────────

/// Append decisions to a JSONL file, one object per line.
pub fn append_decisions(path: &Path, decisions: &[Decision]) -> io::Result<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for d in decisions {
        let json = serde_json::to_string(d).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(file, "{json}")?;
    }
    file.flush()?;
    Ok(decisions.len())
}

/// Read decisions back, skipping blank or malformed lines.
pub fn read_decisions(path: &Path) -> io::Result<Vec<Decision>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = io::BufReader::new(fs::File::open(path)?);
    let mut decisions = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(d) = serde_json::from_str::<Decision>(&line) {
            decisions.push(d);
        }
    }
    Ok(decisions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Baseline;
    use crate::grid_scan::{run_grid_scan, GridScanConfig};

    #[test]
    fn surface_csv_has_header_and_rows() {
        let r = run_grid_scan(&Baseline::default(), &GridScanConfig::default()).unwrap();
        let csv = export_surface_csv(&r.surface).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 290);
        assert!(lines[0].starts_with("distance,attribution"));
        assert!(lines[1].starts_with("1,0.3"));
    }

    #[test]
    fn json_is_pretty() {
        let r = run_grid_scan(&Baseline::default(), &GridScanConfig::default()).unwrap();
        let json = export_json(&r.gate).unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains("\"grid_median\""));
    }
}
