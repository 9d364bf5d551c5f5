//! # Result Writer Module
//!
//! Persists a [`RunOutput`] as JSON and CSV, and optionally as a static HTML
//! report. Every file goes to a temporary file in the destination directory
//! first and is renamed into place, so a failed write never leaves a
//! truncated result behind.

mod csv_report;
mod html_report;

pub use csv_report::{CSV_HEADER, SUMMARY_DELIMITER, to_csv};
pub use html_report::render_html;

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::config::Settings;
use crate::error::Result;
use crate::monitor::RunOutput;

/// Paths of the files written for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub json: PathBuf,
    pub csv: PathBuf,
    pub html: Option<PathBuf>,
}

/// Write `output` as JSON to `json_path` and as CSV to `csv_path`
#[instrument(skip(output))]
pub fn write(output: &RunOutput, json_path: &Path, csv_path: &Path) -> Result<()> {
    write_atomic(json_path, to_json(output)?.as_bytes())?;
    write_atomic(csv_path, &to_csv(output)?)?;
    info!(sites = output.len(), "Results written");
    Ok(())
}

/// Write all result files of a run into the configured output directory
///
/// File names are `results.json` / `results.csv`, with a `_<unix time>`
/// suffix when `timestamp_results` is set. The HTML report is always
/// timestamped.
pub fn write_run(output: &RunOutput, settings: &Settings) -> Result<WrittenFiles> {
    let now = Utc::now();
    let stamp = now.timestamp();
    let dir = &settings.output_dir;

    let (json, csv) = if settings.timestamp_results {
        (
            dir.join(format!("results_{stamp}.json")),
            dir.join(format!("results_{stamp}.csv")),
        )
    } else {
        (dir.join("results.json"), dir.join("results.csv"))
    };
    write(output, &json, &csv)?;

    let html = if settings.html_report {
        let path = dir.join(format!("report_{stamp}.html"));
        write_atomic(&path, render_html(output, now).as_bytes())?;
        Some(path)
    } else {
        None
    };

    Ok(WrittenFiles { json, csv, html })
}

/// Pretty-printed JSON array of site results
pub fn to_json(output: &RunOutput) -> Result<String> {
    Ok(serde_json::to_string_pretty(output)?)
}

/// Read back a results JSON file
pub fn read_json(path: &Path) -> Result<RunOutput> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path)?;

    debug!(path = %path.display(), bytes = bytes.len(), "Wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{PageResult, Verdict};
    use crate::monitor::SiteResult;
    use tempfile::TempDir;

    fn sample_output() -> RunOutput {
        RunOutput::new(vec![
            SiteResult::from_pages(
                "https://boutique.example.fr",
                vec![
                    PageResult::analyzed(
                        "https://boutique.example.fr/",
                        Verdict {
                            has_promotion: true,
                            promotion_summary: "Soldes d'été : -30 % sur les chaussures".to_string(),
                        },
                    ),
                    PageResult::fetch_failed("https://boutique.example.fr/promo", "timeout"),
                ],
            ),
            SiteResult::failed("not a url", "invalid site URL"),
        ])
    }

    #[test]
    fn test_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let json_path = dir.path().join("results.json");
        let csv_path = dir.path().join("results.csv");
        let output = sample_output();

        write(&output, &json_path, &csv_path).unwrap();

        assert_eq!(read_json(&json_path).unwrap(), output);
    }

    #[test]
    fn test_json_keeps_non_ascii() {
        let json = to_json(&sample_output()).unwrap();
        assert!(json.contains("Soldes d'été : -30 % sur les chaussures"));
        assert!(json.contains("\"status\": \"fetch_failed\""));
    }

    #[test]
    fn test_write_creates_nested_directories_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let json_path = dir.path().join("a/b/results.json");
        let csv_path = dir.path().join("a/b/results.csv");

        write(&RunOutput::default(), &json_path, &csv_path).unwrap();
        write(&sample_output(), &json_path, &csv_path).unwrap();

        assert_eq!(read_json(&json_path).unwrap().len(), 2);
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(csv.lines().count(), 3);

        let leftovers = std::fs::read_dir(dir.path().join("a/b")).unwrap().count();
        assert_eq!(leftovers, 2);
    }

    #[test]
    fn test_write_run_file_names() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::builder()
            .sites(["https://a.example"])
            .output_dir(dir.path().join("results"))
            .html_report(true)
            .build();

        let files = write_run(&sample_output(), &settings).unwrap();

        assert_eq!(files.json, dir.path().join("results/results.json"));
        assert_eq!(files.csv, dir.path().join("results/results.csv"));
        let html = files.html.unwrap();
        assert!(html.file_name().unwrap().to_string_lossy().starts_with("report_"));
        assert!(html.exists());
        assert!(files.json.exists());
        assert!(files.csv.exists());
    }

    #[test]
    fn test_write_run_timestamped() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::builder()
            .sites(["https://a.example"])
            .output_dir(dir.path())
            .timestamp_results(true)
            .build();

        let files = write_run(&RunOutput::default(), &settings).unwrap();

        let name = files.json.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("results_") && name.ends_with(".json"));
        assert!(files.html.is_none());
    }
}
