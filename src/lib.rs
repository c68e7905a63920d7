//! Multi-target native build orchestration.
//!
//! Drives external toolchains for a fixed set of targets and gathers what
//! they produce into one output tree. Nothing is compiled here:
//!
//! - **Target registry** - Android ABIs and desktop triples, as constants
//! - **Toolchain invocation** - one `ndk-build` for all ABIs, one `cargo
//!   build` per desktop triple
//! - **Artifact collection** - best-effort moves into `out/<target>/`
//! - **Orchestration** - phase sequencing, fail-fast rules, exit status
//!
//! # Architecture
//!
//! ```text
//! native-builder (binary)
//!     │  parses CLI → BuildConfig, ProjectLayout, TargetRegistry
//!     ▼
//! BuildOrchestrator
//!     ├── preflight   locate ndk-build / cargo
//!     ├── invoke      ndk (all ABIs at once) → cargo (per triple)
//!     ├── collect     libs/<abi>/*, target/<triple>/release/<bin> → out/
//!     └── manifest    out/build-manifest.json
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use native_builder::{BuildConfig, BuildOrchestrator, ProjectLayout, TargetRegistry};
//!
//! let config = BuildConfig { release: false, ..BuildConfig::default() };
//! let layout = ProjectLayout::new("/src/project");
//! let registry = TargetRegistry::select(&["arm64-v8a", "linux64"])?;
//!
//! let report = BuildOrchestrator::new(&config, &layout, &registry).run()?;
//! assert!(report.succeeded());
//! ```

pub mod collect;
pub mod config;
pub mod invoke;
pub mod manifest;
pub mod orchestrator;
pub mod preflight;
pub mod process;
pub mod report;
pub mod target;

pub use collect::{ArtifactMove, Collection, MoveOutcome};
pub use config::{BuildConfig, ProjectLayout, ToolchainPaths, Verbosity};
pub use invoke::BuildResult;
pub use orchestrator::{BuildOrchestrator, BuildReport, Phase, PhaseReport, PhaseStatus};
pub use preflight::Toolchains;
pub use target::{Family, Target, TargetRegistry};
