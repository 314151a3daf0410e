use std::path::PathBuf;

use clap::{ArgAction, Parser};
use termcolor::Color;

use crate::{
    config,
    error::ToolchainError,
    ndk::{self, HostOs, Toolchain},
    pipeline::{DryRunRunner, Pipeline, ProcessRunner, StageRunner},
    shell::{Shell, Verbosity},
};

pub mod env;

#[derive(Debug, Parser)]
#[command(
    name = "build-android-lib",
    version,
    about = "Builds the library for every configured Android architecture using the SDK's NDK and CMake"
)]
struct Args {
    /// Use verbose output (-vv very verbose)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Do not print status output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, value_name = "WHEN")]
    color: Option<String>,

    /// Build settings file (defaults to ./android-build.toml when present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the commands for every stage without running them
    #[arg(long)]
    dry_run: bool,
}

pub(crate) fn init(verbose: u8, quiet: bool, color: Option<&str>) -> anyhow::Result<Shell> {
    let verbosity = match (quiet, verbose) {
        (true, _) => Verbosity::Quiet,
        (false, 0) => Verbosity::Normal,
        (false, 1) => Verbosity::Verbose,
        (false, _) => Verbosity::VeryVerbose,
    };

    let mut shell = Shell::new();
    shell.set_verbosity(verbosity);
    shell.set_color_choice(color)?;
    Ok(shell)
}

fn install_hint(err: &ToolchainError) -> String {
    match err {
        ToolchainError::UnsupportedHost { .. } => {
            "The Android SDK is only looked up in its default Android Studio location on Windows and macOS.".to_string()
        }
        ToolchainError::SdkNotFound { expected, .. } => format!(
            "Install Android Studio and let it set up the SDK in {}.",
            expected.display()
        ),
        ToolchainError::NdkNotInstalled { .. } => {
            "Install \"NDK (Side by side)\" from the SDK Manager in Android Studio.".to_string()
        }
        ToolchainError::CmakeNotInstalled { .. } => {
            "Install \"CMake\" from the SDK Manager in Android Studio.".to_string()
        }
    }
}

/// Discovers the toolchain below the user's home directory, exiting with
/// status 1 if any component is missing.
pub(crate) fn locate_toolchain(shell: &mut Shell) -> anyhow::Result<Toolchain> {
    let Some(home) = dirs::home_dir() else {
        shell.error("Could not determine the home directory.")?;
        std::process::exit(1);
    };

    let discovery = ndk::discover(HostOs::current(), &home, shell);
    match discovery.validate() {
        Ok(toolchain) => Ok(toolchain),
        Err(e) => {
            shell.error(&e)?;
            shell.note(install_hint(&e))?;
            std::process::exit(1);
        }
    }
}

/// Runs the pipeline and returns the process exit status: 0 when every
/// architecture was installed, 1 after the first failing stage.
fn build<R: StageRunner>(
    shell: &mut Shell,
    config: &config::BuildConfig,
    toolchain: &Toolchain,
    work_dir: &std::path::Path,
    runner: R,
) -> anyhow::Result<i32> {
    let mut pipeline = Pipeline::new(config, toolchain, work_dir, runner);

    shell.verbose(|shell| {
        shell.status_with_color(
            "Using",
            format!(
                "NDK {}, cmake {}, make program {}",
                toolchain.ndk.display(),
                toolchain.cmake.display(),
                pipeline.make_program().display()
            ),
            Color::Cyan,
        )
    })?;

    match pipeline.run(shell) {
        Ok(()) => Ok(0),
        Err(e) => {
            shell.error(format!("{:#}", anyhow::Error::from(e)))?;
            Ok(1)
        }
    }
}

pub fn run(args: Vec<String>) -> anyhow::Result<()> {
    let args = Args::try_parse_from(&args).unwrap_or_else(|e| e.exit());

    let mut shell = init(args.verbose, args.quiet, args.color.as_deref())?;

    let work_dir = dunce::canonicalize(std::env::current_dir()?)?;
    let config = match config::load(args.config.as_deref(), &work_dir) {
        Ok(v) => v,
        Err(e) => {
            shell.error(format!("{e:#}"))?;
            std::process::exit(1);
        }
    };

    let toolchain = locate_toolchain(&mut shell)?;

    let code = if args.dry_run {
        build(&mut shell, &config, &toolchain, &work_dir, DryRunRunner)?
    } else {
        build(&mut shell, &config, &toolchain, &work_dir, ProcessRunner)?
    };
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
