//! Build manifest.
//!
//! A JSON record of the last run, written to `out/build-manifest.json`:
//! what was built, how each toolchain exited, and where every artifact went.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

use crate::collect::MoveOutcome;
use crate::config::BuildConfig;
use crate::invoke::BuildResultRecord;
use crate::orchestrator::BuildReport;

#[derive(Debug, Clone, Serialize)]
pub struct BuildManifest {
    pub started_at_utc: String,
    pub finished_at_utc: String,
    pub release: bool,
    pub parallelism: usize,
    pub succeeded: bool,
    pub results: Vec<BuildResultRecord>,
    pub artifacts: Vec<ArtifactRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRecord {
    pub target: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub outcome: MoveOutcome,
    pub sha256: Option<String>,
}

impl BuildManifest {
    pub fn from_report(report: &BuildReport, config: &BuildConfig) -> Self {
        let results = report
            .native
            .results
            .iter()
            .chain(&report.host.results)
            .map(BuildResultRecord::from)
            .collect();

        let artifacts = report
            .collections
            .iter()
            .flat_map(|c| {
                c.moves.iter().map(move |m| ArtifactRecord {
                    target: c.target.short_name.to_string(),
                    source: m.source.clone(),
                    destination: m.destination.clone(),
                    outcome: m.outcome.clone(),
                    sha256: m.sha256.clone(),
                })
            })
            .collect();

        Self {
            started_at_utc: report.started_at_utc.clone(),
            finished_at_utc: report.finished_at_utc.clone(),
            release: config.release,
            parallelism: config.parallelism,
            succeeded: report.succeeded(),
            results,
            artifacts,
        }
    }

    /// Write the manifest, replacing any previous one.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(self).context("serializing build manifest")?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("writing build manifest '{}'", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| {
            format!(
                "renaming build manifest '{}' -> '{}'",
                tmp.display(),
                path.display()
            )
        })?;
        Ok(())
    }
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn now_utc() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}
