//! Preflight checks for build validation.
//!
//! Locates the external toolchains before any build work starts, so a
//! missing NDK is reported as one clear diagnostic instead of a failed
//! child process halfway through a run.
//!
//! Resolution order for `ndk-build`:
//! 1. Explicit NDK root from the CLI/config
//! 2. `NDK_PATH` env var
//! 3. `ANDROID_NDK_HOME` env var
//!
//! Resolution order for `cargo`:
//! 1. Explicit path from the CLI/config
//! 2. `CARGO` env var (set when running under cargo)
//! 3. System PATH (`which cargo`)
//!
//! Located paths are absolute. Toolchains are spawned from other working
//! directories than the one the paths were given relative to.

use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::BuildConfig;
use crate::target::{Family, TargetRegistry};

/// Env vars naming the NDK root. The first non-empty one wins.
pub const NDK_ENV_VARS: &[&str] = &["NDK_PATH", "ANDROID_NDK_HOME"];

#[cfg(windows)]
const NDK_BUILD: &str = "ndk-build.cmd";
#[cfg(not(windows))]
const NDK_BUILD: &str = "ndk-build";

/// Located toolchain executables. `None` when the family is not active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolchains {
    pub ndk_build: Option<PathBuf>,
    pub cargo: Option<PathBuf>,
}

impl Toolchains {
    /// Locate every toolchain the active registry needs, reading the
    /// process environment.
    pub fn locate(config: &BuildConfig, registry: &TargetRegistry) -> Result<Self> {
        Self::locate_with(config, registry, |name| std::env::var_os(name))
    }

    /// Same as [`Toolchains::locate`] with a custom env lookup.
    pub fn locate_with<F>(config: &BuildConfig, registry: &TargetRegistry, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let ndk_build = if registry.active_targets(Family::NativeAbi).is_empty() {
            None
        } else {
            Some(locate_ndk_build(config.toolchains.ndk.as_deref(), &env)?)
        };

        let cargo = if registry.active_targets(Family::HostPlatform).is_empty() {
            None
        } else {
            Some(locate_cargo(config.toolchains.cargo.as_deref(), &env)?)
        };

        Ok(Self { ndk_build, cargo })
    }
}

/// Find the `ndk-build` driver.
pub fn locate_ndk_build<F>(explicit_root: Option<&Path>, env: F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    let root = match explicit_root {
        Some(root) => root.to_path_buf(),
        None => {
            let from_env = NDK_ENV_VARS
                .iter()
                .filter_map(|name| env(name))
                .find(|value| !value.is_empty());
            match from_env {
                Some(value) => PathBuf::from(value),
                None => bail!(
                    "NDK path not found! Please set {} environment variable.",
                    NDK_ENV_VARS.join(" or ")
                ),
            }
        }
    };
    let root = absolute(&root)?;

    if !root.is_dir() {
        bail!("NDK not found at {}", root.display());
    }

    let driver = root.join(NDK_BUILD);
    if !is_executable(&driver) {
        bail!(
            "NDK at {} has no usable {} driver",
            root.display(),
            NDK_BUILD
        );
    }
    Ok(driver)
}

/// Find the cargo executable used for host builds.
pub fn locate_cargo<F>(explicit: Option<&Path>, env: F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    if let Some(path) = explicit {
        if is_executable(path) {
            return absolute(path);
        }
        bail!("cargo not found at {}", path.display());
    }

    if let Some(value) = env("CARGO").filter(|v| !v.is_empty()) {
        let path = PathBuf::from(value);
        if is_executable(&path) {
            return absolute(&path);
        }
        tracing::warn!(
            "CARGO points to unusable path {}, falling back to PATH",
            path.display()
        );
    }

    match which::which("cargo") {
        Ok(path) => absolute(&path),
        Err(_) => bail!(
            "cargo not found.\n\
             Install a Rust toolchain, set CARGO, or pass --cargo <path>."
        ),
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("resolving toolchain path '{}'", path.display()))
}

/// Check that a path is a regular file with an execute bit.
pub fn is_executable(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => {
            if !meta.is_file() {
                return false;
            }
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if meta.permissions().mode() & 0o111 == 0 {
                    return false;
                }
            }
            true
        }
        Err(_) => false,
    }
}
