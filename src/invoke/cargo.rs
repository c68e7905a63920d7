//! Host builds through cargo, one triple per invocation.

use crate::config::{BuildConfig, ProjectLayout};
use crate::process::{exit_code, Cmd, EXIT_CODE_UNAVAILABLE};
use crate::target::Target;

use super::{BuildResult, InvokeContext};

/// Env var cargo reads as its job count.
pub const JOBS_ENV: &str = "CARGO_BUILD_JOBS";

/// Job count for host builds: the configured parallelism, capped.
pub fn host_jobs(config: &BuildConfig, layout: &ProjectLayout) -> usize {
    config.parallelism.min(layout.host_jobs_cap).max(1)
}

/// The cargo command for one host target, without running it.
pub fn command(cargo: &std::path::Path, target: &Target, ctx: &InvokeContext<'_>) -> Cmd {
    let mut cmd = Cmd::new(cargo)
        .args(["build", "--release", "--target", target.triple])
        .env(JOBS_ENV, host_jobs(ctx.config, ctx.layout).to_string())
        .current_dir(&ctx.layout.host_source_root)
        .stream_output(ctx.config.verbosity.is_verbose());
    if ctx.config.verbosity.is_very_verbose() {
        cmd = cmd.arg("--verbose");
    }
    cmd
}

/// Build a single host target.
pub fn build_one(target: &Target, ctx: &InvokeContext<'_>) -> BuildResult {
    let Some(cargo) = ctx.toolchains.cargo.as_deref() else {
        tracing::error!("cargo was not located; cannot build {}", target);
        return BuildResult::from_exit_code(*target, EXIT_CODE_UNAVAILABLE);
    };

    let code = match command(cargo, target, ctx).status() {
        Ok(status) => exit_code(&status),
        Err(e) => {
            tracing::error!("{:#}", e);
            EXIT_CODE_UNAVAILABLE
        }
    };

    if code != 0 {
        tracing::warn!("{} build exited with {}", target.short_name, code);
    }
    BuildResult::from_exit_code(*target, code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Verbosity;
    use crate::preflight::Toolchains;
    use crate::target::HOST_TARGETS;
    use std::ffi::OsString;
    use std::path::Path;

    fn ctx_parts(parallelism: usize, verbosity: u8) -> (BuildConfig, ProjectLayout, Toolchains) {
        let config = BuildConfig {
            parallelism,
            verbosity: Verbosity(verbosity),
            ..BuildConfig::default()
        };
        (config, ProjectLayout::new("/proj"), Toolchains::default())
    }

    #[test]
    fn test_host_jobs_capped() {
        let (config, layout, _) = ctx_parts(64, 0);
        assert_eq!(host_jobs(&config, &layout), 8);
        let (config, layout, _) = ctx_parts(3, 0);
        assert_eq!(host_jobs(&config, &layout), 3);
        let (config, layout, _) = ctx_parts(0, 0);
        assert_eq!(host_jobs(&config, &layout), 1);
    }

    #[test]
    fn test_command_shape() {
        let (config, layout, toolchains) = ctx_parts(16, 0);
        let ctx = InvokeContext {
            config: &config,
            layout: &layout,
            toolchains: &toolchains,
        };
        let cmd = command(Path::new("cargo"), &HOST_TARGETS[2], &ctx);

        let args: Vec<_> = cmd.get_args().iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["build", "--release", "--target", "x86_64-pc-windows-gnu"]);
        assert_eq!(
            cmd.get_envs(),
            [(OsString::from("CARGO_BUILD_JOBS"), OsString::from("8"))]
        );
    }

    #[test]
    fn test_command_very_verbose() {
        let (config, layout, toolchains) = ctx_parts(2, 2);
        let ctx = InvokeContext {
            config: &config,
            layout: &layout,
            toolchains: &toolchains,
        };
        let cmd = command(Path::new("cargo"), &HOST_TARGETS[0], &ctx);
        assert_eq!(cmd.get_args().last().unwrap(), "--verbose");
    }

    #[test]
    fn test_missing_cargo_records_failure() {
        let (config, layout, toolchains) = ctx_parts(2, 0);
        let ctx = InvokeContext {
            config: &config,
            layout: &layout,
            toolchains: &toolchains,
        };
        let result = build_one(&HOST_TARGETS[0], &ctx);
        assert!(!result.succeeded);
        assert_eq!(result.exit_code, EXIT_CODE_UNAVAILABLE);
    }
}
