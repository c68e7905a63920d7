//! Target registry.
//!
//! Static mapping from short platform names (`arm64-v8a`, `win64`, ...) to
//! the triples the toolchains understand. Targets are split into two
//! families because each family is driven by a different toolchain:
//!
//! - [`Family::NativeAbi`] - Android ABIs, all built by one `ndk-build` run
//! - [`Family::HostPlatform`] - desktop triples, one `cargo build` per triple
//!
//! The tables are compile-time constants. A [`TargetRegistry`] only decides
//! which of them are *active* for a run.

use anyhow::{bail, Result};
use std::fmt;

/// Toolchain family a target belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Mobile ABIs built together through the NDK build driver.
    NativeAbi,
    /// Desktop platforms built one at a time through cargo.
    HostPlatform,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Family::NativeAbi => "native-abi",
            Family::HostPlatform => "host",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    /// Short name, unique across the registry. Also the output directory name.
    pub short_name: &'static str,
    /// Toolchain-specific triple.
    pub triple: &'static str,
    pub family: Family,
}

impl Target {
    const fn native(short_name: &'static str, triple: &'static str) -> Self {
        Self {
            short_name,
            triple,
            family: Family::NativeAbi,
        }
    }

    const fn host(short_name: &'static str, triple: &'static str) -> Self {
        Self {
            short_name,
            triple,
            family: Family::HostPlatform,
        }
    }

    /// Whether the triple targets Windows.
    pub fn is_windows(&self) -> bool {
        self.triple.contains("-windows")
    }

    /// Executable suffix for binaries produced for this target.
    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() {
            ".exe"
        } else {
            ""
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.short_name, self.triple)
    }
}

/// Android ABIs, in the order they are passed to `APP_ABI`.
pub const NATIVE_ABIS: &[Target] = &[
    Target::native("armeabi-v7a", "thumbv7neon-linux-androideabi"),
    Target::native("x86", "i686-linux-android"),
    Target::native("arm64-v8a", "aarch64-linux-android"),
    Target::native("x86_64", "x86_64-linux-android"),
];

/// Desktop targets. The compiler is single-target per invocation.
pub const HOST_TARGETS: &[Target] = &[
    Target::host("linux64", "x86_64-unknown-linux-musl"),
    Target::host("linux32", "i686-unknown-linux-musl"),
    Target::host("win64", "x86_64-pc-windows-gnu"),
    Target::host("win32", "i686-pc-windows-gnu"),
];

/// The set of targets active for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRegistry {
    native: Vec<Target>,
    host: Vec<Target>,
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::all()
    }
}

impl TargetRegistry {
    /// Every predefined target.
    pub fn all() -> Self {
        Self {
            native: NATIVE_ABIS.to_vec(),
            host: HOST_TARGETS.to_vec(),
        }
    }

    /// Only the native ABIs; the host family is left empty.
    pub fn native_only() -> Self {
        Self {
            native: NATIVE_ABIS.to_vec(),
            host: Vec::new(),
        }
    }

    /// Build a registry from explicit target lists.
    ///
    /// Each target is filed under its own family regardless of which list it
    /// came from. Used for tests and for embedding in other tools.
    pub fn from_targets(targets: &[Target]) -> Self {
        let mut registry = Self {
            native: Vec::new(),
            host: Vec::new(),
        };
        for target in targets {
            let list = match target.family {
                Family::NativeAbi => &mut registry.native,
                Family::HostPlatform => &mut registry.host,
            };
            if !list.iter().any(|t| t.short_name == target.short_name) {
                list.push(*target);
            }
        }
        registry
    }

    /// Restrict the active set to the given short names.
    ///
    /// Table order is kept no matter the order of `names`.
    pub fn select<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        for name in names {
            let name = name.as_ref();
            if Self::find(name).is_none() {
                let known = NATIVE_ABIS
                    .iter()
                    .chain(HOST_TARGETS)
                    .map(|t| t.short_name)
                    .collect::<Vec<_>>()
                    .join(", ");
                bail!("unknown target '{}'; expected one of: {}", name, known);
            }
        }

        let wanted = |t: &&Target| names.iter().any(|n| n.as_ref() == t.short_name);
        Ok(Self {
            native: NATIVE_ABIS.iter().filter(wanted).copied().collect(),
            host: HOST_TARGETS.iter().filter(wanted).copied().collect(),
        })
    }

    /// Registry for a command line: every target when `names` is empty,
    /// otherwise [`TargetRegistry::select`], minus the host family when
    /// `native_only` is set.
    ///
    /// Fails when the combination leaves nothing to build.
    pub fn for_request<S: AsRef<str>>(names: &[S], native_only: bool) -> Result<Self> {
        let mut registry = if names.is_empty() {
            Self::all()
        } else {
            Self::select(names)?
        };
        if native_only {
            registry = registry.without_host();
        }
        if registry.is_empty() {
            bail!("no targets left to build: every selected target is a host target and host builds are disabled");
        }
        Ok(registry)
    }

    /// Drop every host target from this registry.
    pub fn without_host(mut self) -> Self {
        self.host.clear();
        self
    }

    /// Look up a predefined target by short name.
    pub fn find(short_name: &str) -> Option<Target> {
        NATIVE_ABIS
            .iter()
            .chain(HOST_TARGETS)
            .find(|t| t.short_name == short_name)
            .copied()
    }

    /// Active targets of one family, in registry order.
    pub fn active_targets(&self, family: Family) -> Vec<Target> {
        match family {
            Family::NativeAbi => self.native.clone(),
            Family::HostPlatform => self.host.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.native.is_empty() && self.host.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_targets_is_stable() {
        let registry = TargetRegistry::all();
        let first = registry.active_targets(Family::NativeAbi);
        let second = registry.active_targets(Family::NativeAbi);
        assert_eq!(first, second);

        let names: Vec<_> = first.iter().map(|t| t.short_name).collect();
        assert_eq!(names, ["armeabi-v7a", "x86", "arm64-v8a", "x86_64"]);
    }

    #[test]
    fn test_short_names_are_unique() {
        let mut names: Vec<_> = NATIVE_ABIS
            .iter()
            .chain(HOST_TARGETS)
            .map(|t| t.short_name)
            .collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_families_match_tables() {
        assert!(NATIVE_ABIS.iter().all(|t| t.family == Family::NativeAbi));
        assert!(HOST_TARGETS.iter().all(|t| t.family == Family::HostPlatform));
    }

    #[test]
    fn test_select_keeps_table_order() {
        let registry = TargetRegistry::select(&["win64", "x86_64", "linux64", "armeabi-v7a"]).unwrap();

        let native: Vec<_> = registry
            .active_targets(Family::NativeAbi)
            .iter()
            .map(|t| t.short_name)
            .collect();
        let host: Vec<_> = registry
            .active_targets(Family::HostPlatform)
            .iter()
            .map(|t| t.short_name)
            .collect();

        assert_eq!(native, ["armeabi-v7a", "x86_64"]);
        assert_eq!(host, ["linux64", "win64"]);
    }

    #[test]
    fn test_select_rejects_unknown() {
        let err = TargetRegistry::select(&["mips"]).unwrap_err();
        assert!(err.to_string().contains("unknown target 'mips'"));
        assert!(err.to_string().contains("arm64-v8a"));
    }

    #[test]
    fn test_windows_suffix() {
        let win = TargetRegistry::find("win32").unwrap();
        let linux = TargetRegistry::find("linux64").unwrap();
        assert!(win.is_windows());
        assert_eq!(win.exe_suffix(), ".exe");
        assert_eq!(linux.exe_suffix(), "");
    }

    #[test]
    fn test_native_only_has_no_host() {
        let registry = TargetRegistry::native_only();
        assert!(registry.active_targets(Family::HostPlatform).is_empty());
        assert_eq!(registry.active_targets(Family::NativeAbi).len(), 4);
    }

    #[test]
    fn test_from_targets_files_by_family() {
        let registry = TargetRegistry::from_targets(&[HOST_TARGETS[2], NATIVE_ABIS[0], HOST_TARGETS[2]]);
        assert_eq!(registry.active_targets(Family::NativeAbi), vec![NATIVE_ABIS[0]]);
        assert_eq!(registry.active_targets(Family::HostPlatform), vec![HOST_TARGETS[2]]);
    }

    #[test]
    fn test_for_request_defaults_to_all() {
        let registry = TargetRegistry::for_request::<&str>(&[], false).unwrap();
        assert_eq!(registry, TargetRegistry::all());
        let native = TargetRegistry::for_request::<&str>(&[], true).unwrap();
        assert_eq!(native, TargetRegistry::native_only());
    }

    #[test]
    fn test_for_request_rejects_empty_selection() {
        let err = TargetRegistry::for_request(&["win64", "linux32"], true).unwrap_err();
        assert!(err.to_string().contains("no targets left to build"));

        let kept = TargetRegistry::for_request(&["win64", "x86"], true).unwrap();
        assert!(!kept.is_empty());
        assert!(kept.active_targets(Family::HostPlatform).is_empty());
    }
}
