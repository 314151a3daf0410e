use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::{
    cli::{init, locate_toolchain},
    ndk::Toolchain,
};

#[derive(Debug, Parser)]
#[command(
    name = "build-android-lib-env",
    version,
    about = "Prints the discovered Android SDK, NDK and CMake locations as environment variables"
)]
struct EnvArgs {
    /// Use verbose output
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Do not print warnings
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, value_name = "WHEN")]
    color: Option<String>,

    /// Use PowerShell syntax
    #[arg(long, conflicts_with = "json")]
    powershell: bool,

    /// Print output in JSON format
    #[arg(long)]
    json: bool,
}

pub(crate) fn toolchain_env(toolchain: &Toolchain) -> BTreeMap<&'static str, PathBuf> {
    BTreeMap::from([
        ("ANDROID_SDK_ROOT", toolchain.sdk_root.clone()),
        ("ANDROID_NDK", toolchain.ndk.clone()),
        ("CMAKE_TOOLCHAIN_FILE", toolchain.toolchain_file()),
        ("ANDROID_CMAKE", toolchain.cmake_bin()),
    ])
}

pub fn run(args: Vec<String>) -> anyhow::Result<()> {
    let args = EnvArgs::try_parse_from(&args).unwrap_or_else(|e| e.exit());

    let mut shell = init(args.verbose, args.quiet, args.color.as_deref())?;
    let toolchain = locate_toolchain(&mut shell)?;
    let env = toolchain_env(&toolchain);

    if args.json {
        let env = env
            .into_iter()
            .map(|(k, v)| (k, v.display().to_string()))
            .collect::<BTreeMap<_, _>>();
        println!("{}", serde_json::to_string_pretty(&env)?);
    } else if args.powershell {
        for (k, v) in env {
            println!("${{env:{k}}}={v:?}");
        }
        println!();
        println!("# To import with PowerShell:");
        println!("#     build-android-lib-env --powershell | Out-String | Invoke-Expression");
    } else {
        for (k, v) in env {
            println!("export {k}={v:?}");
        }
        println!();
        println!("# To import with bash/zsh/etc:");
        println!("#     source <(build-android-lib-env)");
    }

    Ok(())
}
