use std::ffi::{OsStr, OsString};
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{ArchitectureSpec, BuildConfig};
use crate::ndk::Toolchain;

/// A single external invocation: program, arguments, extra environment and
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub envs: Vec<(String, String)>,
    pub current_dir: PathBuf,
}

impl StageCommand {
    fn new(program: impl Into<PathBuf>, current_dir: &Path) -> Self {
        StageCommand {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: current_dir.to_path_buf(),
        }
    }

    fn arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(&self.current_dir)
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)));
        cmd
    }
}

impl Display for StageCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.envs {
            write!(f, "{k}={} ", quoted(OsStr::new(v)))?;
        }
        write!(f, "{}", quoted(self.program.as_os_str()))?;
        for arg in &self.args {
            write!(f, " {}", quoted(arg))?;
        }
        Ok(())
    }
}

fn quoted(s: &OsStr) -> String {
    let s = s.to_string_lossy();
    if s.is_empty() || s.contains(char::is_whitespace) {
        format!("{s:?}")
    } else {
        s.into_owned()
    }
}

fn path_define(name: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(format!("-D{name}="));
    arg.push(dunce::simplified(path));
    arg
}

/// The explicitly configured make program, else the SDK's ninja, else
/// `ninja` resolved on `PATH`. A bare `ninja` is left for the spawn to fail on.
pub fn make_program(config: &BuildConfig, toolchain: &Toolchain) -> PathBuf {
    config
        .make_program
        .clone()
        .or_else(|| toolchain.bundled_ninja())
        .or_else(|| which::which("ninja").ok())
        .unwrap_or_else(|| PathBuf::from("ninja"))
}

/// The cmake invocation that generates the build tree for `arch`.
///
/// The architecture name reaches cmake through `config.arch_env_var` on this
/// child only; nothing is written to the current process environment.
pub fn configure_command(
    config: &BuildConfig,
    toolchain: &Toolchain,
    make_program: &Path,
    arch: &ArchitectureSpec,
    build_dir: &Path,
) -> StageCommand {
    let mut cmd = StageCommand::new(toolchain.cmake_bin(), build_dir);
    cmd.arg(format!(
        "-DANDROID_TOOLCHAIN_NAME={}",
        config.toolchain_name(arch)
    ))
    .arg(path_define("ANDROID_NDK", &toolchain.ndk))
    .arg(path_define(
        "CMAKE_TOOLCHAIN_FILE",
        &toolchain.toolchain_file(),
    ))
    .arg(path_define("CMAKE_MAKE_PROGRAM", make_program));

    for define in &config.defines {
        cmd.arg(define.to_arg());
    }

    if !arch.extra_flag.is_empty() {
        cmd.arg(&arch.extra_flag);
    }

    cmd.arg("-G")
        .arg(&config.generator)
        .arg(config.source_dir.as_os_str());
    cmd.envs
        .push((config.arch_env_var.clone(), arch.name.clone()));
    cmd
}

pub fn build_command(make_program: &Path, build_dir: &Path) -> StageCommand {
    StageCommand::new(make_program, build_dir)
}

pub fn install_command(make_program: &Path, build_dir: &Path) -> StageCommand {
    let mut cmd = StageCommand::new(make_program, build_dir);
    cmd.arg("install");
    cmd
}
