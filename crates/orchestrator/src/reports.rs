//! Run report persistence
//!
//! Completed runs are written as `<run_id>.json` (the full report) and
//! `<run_id>.md` (a human-readable digest) under `<output dir>/runs/`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use researcher_core::{value_to_text, RunReport, TaskRunStatus};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{OrchestratorError, Result};

/// Directory for run reports, relative to the output dir
const RUNS_DIR: &str = "runs";

/// Paths of the files written for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub markdown: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ReportStore {
    base_path: PathBuf,
}

impl ReportStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.base_path.join(RUNS_DIR)
    }

    pub fn json_path(&self, run_id: Uuid) -> PathBuf {
        self.runs_dir().join(format!("{}.json", run_id))
    }

    pub fn markdown_path(&self, run_id: Uuid) -> PathBuf {
        self.runs_dir().join(format!("{}.md", run_id))
    }

    pub async fn ensure_directories(&self) -> Result<()> {
        let runs_dir = self.runs_dir();
        debug!("Ensuring directory exists: {:?}", runs_dir);
        fs::create_dir_all(&runs_dir).await?;
        Ok(())
    }

    /// Write both report files (atomic write via temp file + rename)
    pub async fn write_report(&self, report: &RunReport) -> Result<ReportPaths> {
        self.ensure_directories().await?;

        let json = serde_json::to_string_pretty(report)?;
        let paths = ReportPaths {
            json: self.json_path(report.run_id),
            markdown: self.markdown_path(report.run_id),
        };

        write_atomic(&paths.json, &json).await?;
        write_atomic(&paths.markdown, &render_markdown(report)).await?;

        info!(run_id = %report.run_id, "Wrote run report to {:?}", paths.json);
        Ok(paths)
    }

    pub async fn read_report(&self, run_id: Uuid) -> Result<RunReport> {
        let path = self.json_path(run_id);
        debug!("Reading report from {:?}", path);
        let content = fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Run ids with a JSON report on disk, sorted.
    pub async fn list_runs(&self) -> Result<Vec<Uuid>> {
        let runs_dir = self.runs_dir();
        if !fs::try_exists(&runs_dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&runs_dir).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

async fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| OrchestratorError::Serialization(format!("Invalid report path {:?}", path)))?;
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}

/// Human-readable digest of a run.
pub fn render_markdown(report: &RunReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Research run {}", report.run_id);
    let _ = writeln!(out);
    let _ = writeln!(out, "**Query:** {}", report.query);
    let _ = writeln!(
        out,
        "**Started:** {}  \n**Finished:** {}",
        report.started_at.to_rfc3339(),
        report.finished_at.to_rfc3339()
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "## Tasks");
    let _ = writeln!(out);
    let _ = writeln!(out, "| # | Task | Status | Produced | Issues |");
    let _ = writeln!(out, "|---|------|--------|----------|--------|");
    for (i, entry) in report.run_log.iter().enumerate() {
        let issues = entry
            .review
            .as_ref()
            .map(|r| r.issues.len().to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            i + 1,
            entry.task,
            entry.status.as_str(),
            entry.produced.join(", "),
            issues
        );
    }

    if !report.degraded.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "> Scheduled without dependency guarantees: {}",
            report.degraded.join(", ")
        );
    }

    let failures: Vec<_> = report
        .run_log
        .iter()
        .filter(|e| e.status == TaskRunStatus::Failed)
        .collect();
    if !failures.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Failures");
        let _ = writeln!(out);
        for entry in failures {
            let _ = writeln!(
                out,
                "- **{}**: {}",
                entry.task,
                entry.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    let reviewed: Vec<_> = report
        .run_log
        .iter()
        .filter_map(|e| e.review.as_ref().map(|r| (e, r)))
        .collect();
    if !reviewed.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Reviews");
        for (entry, review) in reviewed {
            let _ = writeln!(out);
            let _ = writeln!(out, "### {}", entry.task);
            let _ = writeln!(out);
            if let Some(score) = report
                .state
                .get(&review.key)
                .and_then(|v| v.get("quality_score"))
                .and_then(|v| v.as_f64())
            {
                let _ = writeln!(out, "Quality score: {:.2}", score);
                let _ = writeln!(out);
            }
            if review.issues.is_empty() {
                let _ = writeln!(out, "No issues found.");
            }
            for issue in &review.issues {
                let _ = writeln!(out, "- {}", issue);
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## Outputs");
    for entry in &report.run_log {
        for key in &entry.produced {
            let text = report.state.text(key).unwrap_or_default();
            if text.trim().is_empty() {
                continue;
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "### {}", key);
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", text.trim_end());
        }
    }

    let seeded: Vec<_> = report
        .state
        .iter()
        .filter(|(k, _)| {
            !report
                .run_log
                .iter()
                .any(|e| e.produced.iter().any(|p| p == k))
        })
        .filter(|(k, _)| !k.ends_with("_review"))
        .map(|(k, v)| format!("- `{}`: {}", k, value_to_text(v)))
        .collect();
    if !seeded.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Other state");
        let _ = writeln!(out);
        for line in seeded {
            let _ = writeln!(out, "{}", line);
        }
    }

    out
}
