//! Build orchestration.
//!
//! Runs a build pass as a fixed linear sequence:
//!
//! 1. Locate toolchains (the only hard precondition)
//! 2. Native ABI build, a single all-or-nothing invocation. On failure the
//!    run stops: nothing is collected and no host target is attempted.
//! 3. Collect native outputs
//! 4. Host targets one by one, each followed by collection whether or not
//!    it built. A failing host target does not stop the others.
//! 5. Summarize and write the manifest
//!
//! There are no retries; rerun the whole pass instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use native_builder::{BuildConfig, BuildOrchestrator, ProjectLayout, TargetRegistry};
//!
//! let config = BuildConfig::default();
//! let layout = ProjectLayout::load(Path::new("."), None)?;
//! let registry = TargetRegistry::all();
//! let report = BuildOrchestrator::new(&config, &layout, &registry).run()?;
//! std::process::exit(report.exit_code());
//! ```

mod lock;

pub use lock::BuildLock;

use anyhow::Result;
use std::ffi::OsString;

use crate::collect::{collect, Collection};
use crate::config::{BuildConfig, ProjectLayout};
use crate::invoke::{invoke, BuildResult, InvokeContext};
use crate::manifest::{now_utc, BuildManifest};
use crate::preflight::Toolchains;
use crate::report::Reporter;
use crate::target::{Family, TargetRegistry};

/// A build phase; one per target family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Native,
    Host,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        self.family().as_str()
    }

    pub fn family(self) -> Family {
        match self {
            Phase::Native => Family::NativeAbi,
            Phase::Host => Family::HostPlatform,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    /// Every target built (or there was nothing to build).
    Passed,
    /// Some targets built, some failed.
    Partial,
    Failed,
    /// Not attempted because an earlier phase failed.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,
    pub attempted: bool,
    pub results: Vec<BuildResult>,
}

impl PhaseReport {
    pub fn skipped(phase: Phase) -> Self {
        Self {
            phase,
            attempted: false,
            results: Vec::new(),
        }
    }

    pub fn status(&self) -> PhaseStatus {
        if !self.attempted {
            return PhaseStatus::Skipped;
        }
        let ok = self.results.iter().filter(|r| r.succeeded).count();
        if ok == self.results.len() {
            PhaseStatus::Passed
        } else if ok == 0 {
            PhaseStatus::Failed
        } else {
            PhaseStatus::Partial
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status() == PhaseStatus::Passed
    }
}

/// Everything a build pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub native: PhaseReport,
    pub host: PhaseReport,
    pub collections: Vec<Collection>,
    pub started_at_utc: String,
    pub finished_at_utc: String,
}

impl BuildReport {
    /// Native phase passed and every host target built.
    pub fn succeeded(&self) -> bool {
        self.native.succeeded() && self.host.succeeded()
    }

    /// Process exit code for this report.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }
}

/// Sequences the native and host phases over a fixed target set.
#[derive(Debug, Clone, Copy)]
pub struct BuildOrchestrator<'a> {
    config: &'a BuildConfig,
    layout: &'a ProjectLayout,
    registry: &'a TargetRegistry,
    reporter: Reporter,
}

impl<'a> BuildOrchestrator<'a> {
    pub fn new(
        config: &'a BuildConfig,
        layout: &'a ProjectLayout,
        registry: &'a TargetRegistry,
    ) -> Self {
        Self {
            config,
            layout,
            registry,
            reporter: Reporter::new(config.color),
        }
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Run a full pass, locating toolchains from the process environment.
    ///
    /// `Err` means a configuration problem; nothing was built. Build
    /// failures are reported through the returned [`BuildReport`].
    pub fn run(&self) -> Result<BuildReport> {
        self.run_with_env(|name| std::env::var_os(name))
    }

    /// [`BuildOrchestrator::run`] with a custom env lookup.
    pub fn run_with_env<F>(&self, env: F) -> Result<BuildReport>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let toolchains = Toolchains::locate_with(self.config, self.registry, env)?;
        let _lock = BuildLock::acquire(&self.layout.lock_path())?;
        let started_at_utc = now_utc();

        let ctx = InvokeContext {
            config: self.config,
            layout: self.layout,
            toolchains: &toolchains,
        };

        let mut collections = Vec::new();
        let native = self.native_phase(&ctx, &mut collections);
        let host = if native.succeeded() {
            self.host_phase(&ctx, &mut collections)
        } else {
            tracing::warn!("native ABI build failed, skipping host targets");
            PhaseReport::skipped(Phase::Host)
        };
        self.reporter.phase_summary(&native);
        self.reporter.phase_summary(&host);

        let report = BuildReport {
            native,
            host,
            collections,
            started_at_utc,
            finished_at_utc: now_utc(),
        };

        let manifest = BuildManifest::from_report(&report, self.config);
        if let Err(e) = manifest.write(&self.layout.manifest_path()) {
            tracing::warn!("{:#}", e);
        }

        self.reporter.final_banner(&report);
        Ok(report)
    }

    fn native_phase(&self, ctx: &InvokeContext<'_>, collections: &mut Vec<Collection>) -> PhaseReport {
        let targets = self.registry.active_targets(Family::NativeAbi);
        if !targets.is_empty() {
            let abis = targets.iter().map(|t| t.short_name).collect::<Vec<_>>();
            self.reporter
                .header(&format!("* Building native ABIs: {}", abis.join(" ")));
        }

        let results = invoke(Family::NativeAbi, &targets, ctx);
        let report = PhaseReport {
            phase: Phase::Native,
            attempted: true,
            results,
        };

        if report.succeeded() {
            collections.extend(targets.iter().map(|t| collect(t, self.layout)));
        } else {
            self.reporter.error("Build binary failed!");
        }
        report
    }

    fn host_phase(&self, ctx: &InvokeContext<'_>, collections: &mut Vec<Collection>) -> PhaseReport {
        let mut results = Vec::new();
        for target in self.registry.active_targets(Family::HostPlatform) {
            self.reporter
                .header(&format!("* Building host target: {}", target));
            results.extend(invoke(Family::HostPlatform, &[target], ctx));
            collections.push(collect(&target, self.layout));
        }
        PhaseReport {
            phase: Phase::Host,
            attempted: true,
            results,
        }
    }
}
