//! Toolchain invocation.
//!
//! One entry point, [`invoke`], dispatches on the target family:
//!
//! - [`ndk`] - all native ABIs in a single `ndk-build` run
//! - [`cargo`] - one `cargo build` per host triple
//!
//! Failing children are reported through [`BuildResult`], never as `Err`.
//! Whether to carry on after a failure is the caller's decision.

pub mod cargo;
pub mod ndk;

use serde::Serialize;

use crate::config::{BuildConfig, ProjectLayout};
use crate::preflight::Toolchains;
use crate::target::{Family, Target};

/// Outcome of building one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub target: Target,
    pub exit_code: i32,
    pub succeeded: bool,
}

impl BuildResult {
    pub fn from_exit_code(target: Target, exit_code: i32) -> Self {
        Self {
            target,
            exit_code,
            succeeded: exit_code == 0,
        }
    }
}

/// Serializable view of a [`BuildResult`] for the run manifest.
#[derive(Debug, Clone, Serialize)]
pub struct BuildResultRecord {
    pub target: String,
    pub triple: String,
    pub family: String,
    pub exit_code: i32,
    pub succeeded: bool,
}

impl From<&BuildResult> for BuildResultRecord {
    fn from(result: &BuildResult) -> Self {
        Self {
            target: result.target.short_name.to_string(),
            triple: result.target.triple.to_string(),
            family: result.target.family.to_string(),
            exit_code: result.exit_code,
            succeeded: result.succeeded,
        }
    }
}

/// Everything an invocation needs besides the targets.
#[derive(Debug, Clone, Copy)]
pub struct InvokeContext<'a> {
    pub config: &'a BuildConfig,
    pub layout: &'a ProjectLayout,
    pub toolchains: &'a Toolchains,
}

/// Build `targets` of one family.
///
/// Native ABIs yield one result per ABI, all carrying the exit code of the
/// single shared invocation. Host targets yield one result per invocation.
pub fn invoke(family: Family, targets: &[Target], ctx: &InvokeContext<'_>) -> Vec<BuildResult> {
    match family {
        Family::NativeAbi => ndk::build(targets, ctx),
        Family::HostPlatform => targets
            .iter()
            .map(|target| cargo::build_one(target, ctx))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{HOST_TARGETS, NATIVE_ABIS};

    #[test]
    fn test_result_from_exit_code() {
        assert!(BuildResult::from_exit_code(NATIVE_ABIS[0], 0).succeeded);
        let failed = BuildResult::from_exit_code(HOST_TARGETS[0], 101);
        assert!(!failed.succeeded);
        assert_eq!(failed.exit_code, 101);
    }

    #[test]
    fn test_record_fields() {
        let record = BuildResultRecord::from(&BuildResult::from_exit_code(HOST_TARGETS[2], 1));
        assert_eq!(record.target, "win64");
        assert_eq!(record.triple, "x86_64-pc-windows-gnu");
        assert_eq!(record.family, "host");
        assert!(!record.succeeded);
    }
}
