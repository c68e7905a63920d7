//! Artifact collection.
//!
//! Relocates toolchain outputs into the canonical `out/<target>/` tree:
//!
//! - native ABI: every file under `libs/<abi>/` → `out/<abi>/<file>`
//! - host: `target/<triple>/release/<binary>[.exe]` → `out/<short>/<binary>[.exe]`
//!
//! Collection is best-effort. A missing source is expected after a partial
//! build and is recorded as [`MoveOutcome::SkippedMissingSource`]; any other
//! failure is recorded as [`MoveOutcome::Failed`] and only logged at verbose
//! level. Neither turns into a build failure.
//!
//! Both families use move semantics. Output directories are created on the
//! first successful move into them, never up front.

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProjectLayout;
use crate::target::{Family, Target};

/// What happened to one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum MoveOutcome {
    Moved,
    SkippedMissingSource,
    Failed(String),
}

/// A single attempted relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMove {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub outcome: MoveOutcome,
    /// Digest of the relocated file, when it moved.
    pub sha256: Option<String>,
}

/// Every relocation attempted for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub target: Target,
    pub moves: Vec<ArtifactMove>,
}

impl Collection {
    /// Relocations that actually happened.
    pub fn moved(&self) -> impl Iterator<Item = &ArtifactMove> {
        self.moves
            .iter()
            .filter(|m| m.outcome == MoveOutcome::Moved)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ArtifactMove> {
        self.moves
            .iter()
            .filter(|m| matches!(m.outcome, MoveOutcome::Failed(_)))
    }
}

/// Relocate everything the toolchain produced for `target`.
pub fn collect(target: &Target, layout: &ProjectLayout) -> Collection {
    let out_dir = layout.target_out_dir(target.short_name);
    let moves = match target.family {
        Family::NativeAbi => collect_native(target, layout, &out_dir),
        Family::HostPlatform => {
            let file_name = format!("{}{}", layout.binary_name, target.exe_suffix());
            let source = layout.host_release_dir(target.triple).join(&file_name);
            vec![move_artifact(&source, &out_dir.join(&file_name))]
        }
    };

    let moved = moves
        .iter()
        .filter(|m| m.outcome == MoveOutcome::Moved)
        .count();
    tracing::info!("{}: collected {} artifact(s)", target.short_name, moved);

    Collection {
        target: *target,
        moves,
    }
}

fn collect_native(target: &Target, layout: &ProjectLayout, out_dir: &Path) -> Vec<ArtifactMove> {
    let abi_dir = layout.libs_root.join(target.short_name);
    if !abi_dir.is_dir() {
        tracing::info!("no outputs for {} at {}", target.short_name, abi_dir.display());
        return vec![ArtifactMove {
            source: abi_dir,
            destination: out_dir.to_path_buf(),
            outcome: MoveOutcome::SkippedMissingSource,
            sha256: None,
        }];
    }

    let mut moves = Vec::new();
    for entry in WalkDir::new(&abi_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() {
                    continue;
                }
                let destination = out_dir.join(entry.file_name());
                moves.push(move_artifact(entry.path(), &destination));
            }
            Err(e) => {
                tracing::info!("error reading {}: {}", abi_dir.display(), e);
                moves.push(ArtifactMove {
                    source: e.path().map(Path::to_path_buf).unwrap_or_else(|| abi_dir.clone()),
                    destination: out_dir.to_path_buf(),
                    outcome: MoveOutcome::Failed(e.to_string()),
                    sha256: None,
                });
            }
        }
    }
    moves
}

/// Move one file, creating the destination directory if needed.
///
/// Never fails: the outcome is part of the returned record.
pub fn move_artifact(source: &Path, destination: &Path) -> ArtifactMove {
    let outcome = if fs::symlink_metadata(source).is_err() {
        MoveOutcome::SkippedMissingSource
    } else {
        match relocate(source, destination) {
            Ok(()) => {
                tracing::info!("mv {} -> {}", source.display(), destination.display());
                MoveOutcome::Moved
            }
            Err(e) => {
                tracing::info!("{:#}", e);
                MoveOutcome::Failed(format!("{:#}", e))
            }
        }
    };

    let sha256 = if outcome == MoveOutcome::Moved {
        match sha256_file(destination) {
            Ok(sha) => Some(sha),
            Err(e) => {
                tracing::warn!("{:#}", e);
                None
            }
        }
    } else {
        None
    };

    ArtifactMove {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        outcome,
        sha256,
    }
}

fn relocate(source: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }

    // An existing destination is overwritten by rename or copy, never removed first.
    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }

    // rename does not cross filesystems; fall back to copy + unlink.
    fs::copy(source, destination).with_context(|| {
        format!(
            "moving '{}' -> '{}'",
            source.display(),
            destination.display()
        )
    })?;
    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(destination);
        return Err(e).with_context(|| {
            format!("removing moved source '{}'", source.display())
        });
    }
    Ok(())
}

fn sha256_file(path: &Path) -> Result<String> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut r = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = r
            .read(&mut buf)
            .with_context(|| format!("reading {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
