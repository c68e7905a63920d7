//! Native ABI builds through the NDK build driver.
//!
//! All active ABIs go into one `ndk-build` run via a combined `APP_ABI`
//! list, so the family succeeds or fails as a unit.

use crate::config::{BuildConfig, ProjectLayout};
use crate::process::{exit_code, Cmd, WorkingDir, EXIT_CODE_UNAVAILABLE};
use crate::target::Target;

use super::{BuildResult, InvokeContext};

/// Arguments for one `ndk-build` run, in order.
pub fn ndk_build_args(targets: &[Target], config: &BuildConfig, layout: &ProjectLayout) -> Vec<String> {
    let abis = targets
        .iter()
        .map(|t| t.short_name)
        .collect::<Vec<_>>()
        .join(" ");

    let mut args = layout.module_flags.clone();
    args.push("NDK_PROJECT_PATH=.".to_string());
    args.push(format!(
        "NDK_APPLICATION_MK={}",
        layout.application_mk.display()
    ));
    args.push(format!("APP_ABI={}", abis));
    args.push(format!("-j{}", config.parallelism));
    if config.verbosity.is_very_verbose() {
        args.push("V=1".to_string());
    }
    if !config.release {
        args.push(layout.debug_flag.clone());
    }
    args
}

/// Run `ndk-build` for every target from inside the native source root.
pub fn build(targets: &[Target], ctx: &InvokeContext<'_>) -> Vec<BuildResult> {
    if targets.is_empty() {
        return Vec::new();
    }

    let code = run(targets, ctx);
    targets
        .iter()
        .map(|target| BuildResult::from_exit_code(*target, code))
        .collect()
}

fn run(targets: &[Target], ctx: &InvokeContext<'_>) -> i32 {
    let Some(driver) = ctx.toolchains.ndk_build.as_deref() else {
        tracing::error!("ndk-build was not located; native ABIs cannot be built");
        return EXIT_CODE_UNAVAILABLE;
    };

    let cmd = Cmd::new(driver)
        .args(ndk_build_args(targets, ctx.config, ctx.layout))
        .stream_output(ctx.config.verbosity.is_verbose());

    // Dropped on every return path below, restoring the caller's directory.
    let _cwd = match WorkingDir::enter(&ctx.layout.native_root) {
        Ok(guard) => guard,
        Err(e) => {
            tracing::error!("{:#}", e);
            return EXIT_CODE_UNAVAILABLE;
        }
    };

    match cmd.status() {
        Ok(status) => exit_code(&status),
        Err(e) => {
            tracing::error!("{:#}", e);
            EXIT_CODE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Verbosity;
    use crate::preflight::Toolchains;
    use crate::process::cwd_test_lock;
    use crate::target::NATIVE_ABIS;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config(verbosity: u8, release: bool) -> BuildConfig {
        BuildConfig {
            verbosity: Verbosity(verbosity),
            release,
            parallelism: 6,
            ..BuildConfig::default()
        }
    }

    #[test]
    fn test_args_release_quiet() {
        let layout = ProjectLayout::new("/proj");
        let args = ndk_build_args(NATIVE_ABIS, &config(0, true), &layout);
        assert_eq!(
            args,
            [
                "B_BOOT=1",
                "B_CRT0=1",
                "NDK_PROJECT_PATH=.",
                "NDK_APPLICATION_MK=src/Application.mk",
                "APP_ABI=armeabi-v7a x86 arm64-v8a x86_64",
                "-j6",
            ]
        );
    }

    #[test]
    fn test_args_debug_very_verbose() {
        let layout = ProjectLayout::new("/proj");
        let args = ndk_build_args(&NATIVE_ABIS[2..], &config(2, false), &layout);
        assert!(args.contains(&"APP_ABI=arm64-v8a x86_64".to_string()));
        assert_eq!(&args[args.len() - 2..], ["V=1", "MAGISK_DEBUG=1"]);
    }

    #[test]
    fn test_args_verbose_one_has_no_make_echo() {
        let layout = ProjectLayout::new("/proj");
        let args = ndk_build_args(NATIVE_ABIS, &config(1, true), &layout);
        assert!(!args.contains(&"V=1".to_string()));
    }

    #[test]
    fn test_empty_targets_do_not_invoke() {
        let layout = ProjectLayout::new("/proj");
        let cfg = config(0, true);
        let toolchains = Toolchains::default();
        let ctx = InvokeContext {
            config: &cfg,
            layout: &layout,
            toolchains: &toolchains,
        };
        assert!(build(&[], &ctx).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_build_runs_inside_native_root_and_restores_cwd() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = cwd_test_lock();
        let before = std::env::current_dir().unwrap();
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp.path());
        fs::create_dir_all(&layout.native_root).unwrap();

        let driver = temp.path().join("ndk-build");
        fs::write(&driver, "#!/bin/sh\npwd > ran-in.txt\nexit 2\n").unwrap();
        fs::set_permissions(&driver, fs::Permissions::from_mode(0o755)).unwrap();

        let cfg = config(0, true);
        let toolchains = Toolchains {
            ndk_build: Some(driver),
            cargo: None,
        };
        let ctx = InvokeContext {
            config: &cfg,
            layout: &layout,
            toolchains: &toolchains,
        };

        let results = build(&NATIVE_ABIS[..2], &ctx);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.succeeded && r.exit_code == 2));
        assert_eq!(std::env::current_dir().unwrap(), before);

        let ran_in = fs::read_to_string(layout.native_root.join("ran-in.txt")).unwrap();
        assert_eq!(
            Path::new(ran_in.trim()).canonicalize().unwrap(),
            layout.native_root.canonicalize().unwrap()
        );
    }

    #[test]
    fn test_missing_native_root_fails_all() {
        let _lock = cwd_test_lock();
        let before = std::env::current_dir().unwrap();
        let layout = ProjectLayout::new("/definitely/not/a/project/12345");
        let cfg = config(0, true);
        let toolchains = Toolchains {
            ndk_build: Some("/bin/true".into()),
            cargo: None,
        };
        let ctx = InvokeContext {
            config: &cfg,
            layout: &layout,
            toolchains: &toolchains,
        };

        let results = build(NATIVE_ABIS, &ctx);
        assert!(results
            .iter()
            .all(|r| r.exit_code == EXIT_CODE_UNAVAILABLE && !r.succeeded));
        assert_eq!(std::env::current_dir().unwrap(), before);
    }
}
