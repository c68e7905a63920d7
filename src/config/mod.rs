//! Build configuration.
//!
//! Two values describe a run:
//!
//! - [`BuildConfig`] - how to build (verbosity, release mode, job count,
//!   explicit toolchain paths, color). Built once by the CLI and passed by
//!   reference to every component.
//! - [`ProjectLayout`] - where things live on disk. Defaults match the
//!   standard project tree and can be overridden by `native-build.toml`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the optional per-project config file.
pub const CONFIG_FILENAME: &str = "native-build.toml";

/// Upper bound on `CARGO_BUILD_JOBS` for host builds.
pub const DEFAULT_HOST_JOBS_CAP: usize = 8;

/// Verbosity level (`-v` count).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(pub u8);

impl Verbosity {
    /// Level 1 and above: child output is streamed, moves are logged.
    pub fn is_verbose(self) -> bool {
        self.0 >= 1
    }

    /// Level 2 and above: toolchains are asked to echo their commands.
    pub fn is_very_verbose(self) -> bool {
        self.0 >= 2
    }
}

/// Explicit toolchain locations. `None` means "detect".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainPaths {
    /// NDK root directory (the one containing `ndk-build`).
    pub ndk: Option<PathBuf>,
    /// Path to the cargo executable.
    pub cargo: Option<PathBuf>,
}

/// Read-only settings for one orchestrator run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub verbosity: Verbosity,
    pub release: bool,
    /// Job count handed to the toolchains.
    pub parallelism: usize,
    pub toolchains: ToolchainPaths,
    pub color: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::default(),
            release: true,
            parallelism: default_parallelism(),
            toolchains: ToolchainPaths::default(),
            color: true,
        }
    }
}

/// Logical CPU count of the host, or 4 if it cannot be determined.
pub fn default_parallelism() -> usize {
    match std::thread::available_parallelism() {
        Ok(n) => n.get(),
        Err(e) => {
            tracing::warn!("could not detect CPU count ({}), using 4 jobs", e);
            4
        }
    }
}

/// On-disk layout of the project being built.
///
/// All paths are absolute once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    /// Directory `ndk-build` runs in (`NDK_PROJECT_PATH=.`).
    pub native_root: PathBuf,
    /// Application descriptor, relative to `native_root`.
    pub application_mk: PathBuf,
    /// Where `ndk-build` leaves per-ABI outputs.
    pub libs_root: PathBuf,
    /// Cargo workspace for host builds.
    pub host_source_root: PathBuf,
    /// Root of the `out/<target>/` tree.
    pub out_root: PathBuf,
    /// Binary produced by the host build.
    pub binary_name: String,
    /// Extra `make` variables selecting what `ndk-build` compiles.
    pub module_flags: Vec<String>,
    /// Define passed to `ndk-build` in debug mode.
    pub debug_flag: String,
    pub host_jobs_cap: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutToml {
    #[serde(default)]
    native: NativeToml,
    #[serde(default)]
    host: HostToml,
    #[serde(default)]
    output: OutputToml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NativeToml {
    dir: Option<PathBuf>,
    application_mk: Option<PathBuf>,
    libs_dir: Option<PathBuf>,
    module_flags: Option<Vec<String>>,
    debug_flag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HostToml {
    source_dir: Option<PathBuf>,
    binary: Option<String>,
    jobs_cap: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OutputToml {
    dir: Option<PathBuf>,
}

impl ProjectLayout {
    /// Default layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::from_toml(root.into(), LayoutToml::default())
    }

    /// Layout for `root`, applying overrides from a config file.
    ///
    /// An explicit `config_file` must exist. Without one,
    /// `<root>/native-build.toml` is used when present.
    pub fn load(root: &Path, config_file: Option<&Path>) -> Result<Self> {
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .context("resolving current directory")?
                .join(root)
        };

        let path = match config_file {
            Some(path) => {
                if !path.is_file() {
                    bail!("config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Some(root.join(CONFIG_FILENAME)).filter(|p| p.is_file()),
        };

        let parsed = match path {
            Some(path) => {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("reading build config '{}'", path.display()))?;
                let parsed: LayoutToml = toml::from_str(&text)
                    .with_context(|| format!("parsing build config '{}'", path.display()))?;
                tracing::info!("loaded layout overrides from {}", path.display());
                parsed
            }
            None => LayoutToml::default(),
        };

        let layout = Self::from_toml(root, parsed);
        if layout.host_jobs_cap == 0 {
            bail!("[host] jobs_cap must be at least 1");
        }
        Ok(layout)
    }

    fn from_toml(root: PathBuf, cfg: LayoutToml) -> Self {
        let native_root = root.join(cfg.native.dir.unwrap_or_else(|| "native".into()));
        let libs_root = native_root.join(cfg.native.libs_dir.unwrap_or_else(|| "libs".into()));
        let host_source_root = root.join(cfg.host.source_dir.unwrap_or_else(|| "native/src".into()));
        let out_root = root.join(cfg.output.dir.unwrap_or_else(|| "native/out".into()));

        Self {
            application_mk: cfg
                .native
                .application_mk
                .unwrap_or_else(|| "src/Application.mk".into()),
            module_flags: cfg
                .native
                .module_flags
                .unwrap_or_else(|| vec!["B_BOOT=1".to_string(), "B_CRT0=1".to_string()]),
            debug_flag: cfg
                .native
                .debug_flag
                .unwrap_or_else(|| "MAGISK_DEBUG=1".to_string()),
            binary_name: cfg.host.binary.unwrap_or_else(|| "magiskboot".to_string()),
            host_jobs_cap: cfg.host.jobs_cap.unwrap_or(DEFAULT_HOST_JOBS_CAP),
            native_root,
            libs_root,
            host_source_root,
            out_root,
            root,
        }
    }

    /// Output directory for one target: `out/<short_name>`.
    pub fn target_out_dir(&self, short_name: &str) -> PathBuf {
        self.out_root.join(short_name)
    }

    /// Build cache directory cargo uses for a triple.
    pub fn host_release_dir(&self, triple: &str) -> PathBuf {
        self.host_source_root
            .join("target")
            .join(triple)
            .join("release")
    }

    /// Exclusive lock file guarding one run against another.
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".native-build.lock")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.out_root.join("build-manifest.json")
    }
}
