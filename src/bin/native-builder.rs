use std::io::IsTerminal;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser};
use native_builder::config::default_parallelism;
use native_builder::report::Reporter;
use native_builder::{
    BuildConfig, BuildOrchestrator, ProjectLayout, TargetRegistry, ToolchainPaths, Verbosity,
};
use tracing_subscriber::EnvFilter;

/// Build native binaries for every Android ABI and desktop target.
#[derive(Parser, Debug)]
#[command(name = "native-builder", version)]
struct Cli {
    /// Verbose output (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Release build (debug defines are not passed to ndk-build)
    #[arg(short, long)]
    release: bool,

    /// Parallel jobs for the toolchains (default: CPU count)
    #[arg(short, long, value_name = "N")]
    jobs: Option<NonZeroUsize>,

    /// NDK root directory (default: $NDK_PATH, then $ANDROID_NDK_HOME)
    #[arg(long, value_name = "DIR")]
    ndk: Option<PathBuf>,

    /// cargo executable for host targets (default: $CARGO, then PATH)
    #[arg(long, value_name = "PATH")]
    cargo: Option<PathBuf>,

    /// Project root
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: PathBuf,

    /// Layout overrides (default: <root>/native-build.toml if present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only build these targets (repeatable), e.g. -t arm64-v8a -t win64
    #[arg(short = 't', long = "target", value_name = "NAME")]
    targets: Vec<String>,

    /// Skip host targets
    #[arg(long)]
    native_only: bool,

    /// Disable colored banners
    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let color = !cli.no_color
        && std::env::var_os("NO_COLOR").is_none()
        && std::io::stdout().is_terminal();
    let reporter = Reporter::new(color);

    match run(cli, color) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            reporter.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, color: bool) -> Result<u8> {
    let config = BuildConfig {
        verbosity: Verbosity(cli.verbose),
        release: cli.release,
        parallelism: cli.jobs.map(NonZeroUsize::get).unwrap_or_else(default_parallelism),
        toolchains: ToolchainPaths {
            ndk: cli.ndk,
            cargo: cli.cargo,
        },
        color,
    };

    let layout = ProjectLayout::load(&cli.root, cli.config.as_deref())?;

    let registry = TargetRegistry::for_request(cli.targets.as_slice(), cli.native_only)?;

    let report = BuildOrchestrator::new(&config, &layout, &registry).run()?;
    Ok(u8::try_from(report.exit_code()).unwrap_or(1))
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
