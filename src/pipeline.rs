use std::fmt::{self, Display};
use std::io;
use std::path::{Path, PathBuf};

use termcolor::Color;

use crate::cmake::{self, StageCommand};
use crate::config::{ArchitectureSpec, BuildConfig};
use crate::error::BuildError;
use crate::ndk::Toolchain;
use crate::shell::Shell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Configure,
    Build,
    Install,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Configure => "configure",
            Stage::Build => "build",
            Stage::Install => "install",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit code of a finished stage; `None` if it was killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOutcome {
    pub code: Option<i32>,
}

impl StageOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes stage commands. Blocks until the stage finishes.
pub trait StageRunner {
    fn run(&mut self, stage: Stage, cmd: &StageCommand) -> io::Result<StageOutcome>;

    /// Makes sure `dir` exists before the configure stage runs in it.
    fn prepare_dir(&mut self, dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(dir)
    }
}

/// Spawns the command and waits for it, with no timeout.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl StageRunner for ProcessRunner {
    fn run(&mut self, _stage: Stage, cmd: &StageCommand) -> io::Result<StageOutcome> {
        let status = cmd.to_command().status()?;
        Ok(StageOutcome {
            code: status.code(),
        })
    }
}

/// Prints each command to stdout instead of running it.
#[derive(Debug, Default)]
pub struct DryRunRunner;

impl StageRunner for DryRunRunner {
    fn run(&mut self, _stage: Stage, cmd: &StageCommand) -> io::Result<StageOutcome> {
        println!("(cd {} && {})", cmd.current_dir.display(), cmd);
        Ok(StageOutcome { code: Some(0) })
    }

    fn prepare_dir(&mut self, dir: &Path) -> io::Result<()> {
        println!("mkdir -p {}", dir.display());
        Ok(())
    }
}

/// Builds every configured architecture in order, stopping at the first
/// failing stage.
pub struct Pipeline<'a, R> {
    config: &'a BuildConfig,
    toolchain: &'a Toolchain,
    work_dir: PathBuf,
    make_program: PathBuf,
    runner: R,
}

impl<'a, R: StageRunner> Pipeline<'a, R> {
    pub fn new(
        config: &'a BuildConfig,
        toolchain: &'a Toolchain,
        work_dir: &Path,
        runner: R,
    ) -> Self {
        Pipeline {
            config,
            toolchain,
            work_dir: work_dir.to_path_buf(),
            make_program: cmake::make_program(config, toolchain),
            runner,
        }
    }

    pub fn make_program(&self) -> &Path {
        &self.make_program
    }

    pub fn into_runner(self) -> R {
        self.runner
    }

    pub fn run(&mut self, shell: &mut Shell) -> Result<(), BuildError> {
        let config = self.config;
        for arch in &config.architectures {
            let _ = shell.status_with_color(
                "Building",
                format!("arch {}", arch.name),
                Color::Yellow,
            );
            self.build_arch(arch, shell)?;
        }

        let _ = shell.status(
            "Finished",
            format!(
                "{} architecture(s): {}",
                config.architectures.len(),
                config
                    .architectures
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        );
        Ok(())
    }

    fn build_arch(&mut self, arch: &ArchitectureSpec, shell: &mut Shell) -> Result<(), BuildError> {
        let build_dir = self.config.build_dir(&self.work_dir, arch);
        self.runner.prepare_dir(&build_dir).map_err(|source| BuildError::BuildDir {
            path: build_dir.clone(),
            source,
        })?;

        let configure = cmake::configure_command(
            self.config,
            self.toolchain,
            &self.make_program,
            arch,
            &build_dir,
        );
        self.run_stage(arch, Stage::Configure, &configure, shell)?;

        let build = cmake::build_command(&self.make_program, &build_dir);
        self.run_stage(arch, Stage::Build, &build, shell)?;

        let install = cmake::install_command(&self.make_program, &build_dir);
        self.run_stage(arch, Stage::Install, &install, shell)
    }

    fn run_stage(
        &mut self,
        arch: &ArchitectureSpec,
        stage: Stage,
        cmd: &StageCommand,
        shell: &mut Shell,
    ) -> Result<(), BuildError> {
        let _ = shell.verbose(|shell| {
            shell.status_with_color("Running", format!("[{stage}] {cmd}"), Color::Cyan)
        });

        let outcome = self.runner.run(stage, cmd).map_err(|source| BuildError::Spawn {
            arch: arch.name.clone(),
            stage,
            program: cmd.program.display().to_string(),
            source,
        })?;

        if outcome.success() {
            Ok(())
        } else {
            Err(BuildError::StageFailed {
                arch: arch.name.clone(),
                stage,
                code: outcome.code,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Stage, StageCommand)>,
        fail: HashMap<(String, Stage), Option<i32>>,
        spawn_error: bool,
    }

    impl Recorder {
        fn failing(arch: &str, stage: Stage, code: Option<i32>) -> Self {
            let mut recorder = Recorder::default();
            recorder.fail.insert((arch.to_string(), stage), code);
            recorder
        }
    }

    impl StageRunner for Recorder {
        fn run(&mut self, stage: Stage, cmd: &StageCommand) -> io::Result<StageOutcome> {
            self.calls.push((stage, cmd.clone()));
            if self.spawn_error {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
            }
            let arch = cmd
                .current_dir
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            let code = self.fail.get(&(arch, stage)).copied().unwrap_or(Some(0));
            Ok(StageOutcome { code })
        }
    }

    fn toolchain() -> Toolchain {
        let sdk = PathBuf::from("/home/dev/Library/Android/sdk");
        Toolchain {
            ndk: sdk.join("ndk").join("25.2.9519653"),
            cmake: sdk.join("cmake").join("3.22.1"),
            sdk_root: sdk,
        }
    }

    fn quiet_shell() -> Shell {
        Shell::from_write(Box::new(io::sink()))
    }

    #[test]
    fn all_stages_succeed() {
        let work = tempfile::tempdir().unwrap();
        let config = BuildConfig::default();
        let toolchain = toolchain();

        let mut pipeline = Pipeline::new(&config, &toolchain, work.path(), Recorder::default());
        pipeline.run(&mut quiet_shell()).unwrap();
        let calls = pipeline.into_runner().calls;

        assert_eq!(calls.len(), 6);
        let stages = calls.iter().map(|(s, _)| *s).collect::<Vec<_>>();
        assert_eq!(
            stages,
            [
                Stage::Configure,
                Stage::Build,
                Stage::Install,
                Stage::Configure,
                Stage::Build,
                Stage::Install
            ]
        );
        for (i, arch) in ["aarch64", "arm"].iter().enumerate() {
            let dir = work.path().join(format!("build.{arch}"));
            assert!(dir.is_dir());
            for (_, cmd) in &calls[i * 3..i * 3 + 3] {
                assert_eq!(cmd.current_dir, dir);
            }
        }
        assert_eq!(calls[2].1.args, vec![std::ffi::OsString::from("install")]);
        assert!(calls[1].1.args.is_empty());
    }

    #[test]
    fn configure_failure_stops_everything() {
        let work = tempfile::tempdir().unwrap();
        let config = BuildConfig::default();
        let toolchain = toolchain();

        let mut pipeline = Pipeline::new(
            &config,
            &toolchain,
            work.path(),
            Recorder::failing("aarch64", Stage::Configure, Some(1)),
        );
        let err = pipeline.run(&mut quiet_shell()).unwrap_err();
        let calls = pipeline.into_runner().calls;

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Stage::Configure);
        assert!(!work.path().join("build.arm").exists());
        match err {
            BuildError::StageFailed { arch, stage, code } => {
                assert_eq!(arch, "aarch64");
                assert_eq!(stage, Stage::Configure);
                assert_eq!(code, Some(1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn build_failure_skips_install_and_later_arches() {
        let work = tempfile::tempdir().unwrap();
        let config = BuildConfig::default();
        let toolchain = toolchain();

        let mut pipeline = Pipeline::new(
            &config,
            &toolchain,
            work.path(),
            Recorder::failing("aarch64", Stage::Build, Some(2)),
        );
        assert!(pipeline.run(&mut quiet_shell()).is_err());
        let stages = pipeline
            .into_runner()
            .calls
            .iter()
            .map(|(s, _)| *s)
            .collect::<Vec<_>>();
        assert_eq!(stages, [Stage::Configure, Stage::Build]);
    }

    #[test]
    fn install_failure_in_second_arch() {
        let work = tempfile::tempdir().unwrap();
        let config = BuildConfig::default();
        let toolchain = toolchain();

        let mut pipeline = Pipeline::new(
            &config,
            &toolchain,
            work.path(),
            Recorder::failing("arm", Stage::Install, None),
        );
        let err = pipeline.run(&mut quiet_shell()).unwrap_err();
        assert_eq!(pipeline.into_runner().calls.len(), 6);
        assert!(matches!(
            err,
            BuildError::StageFailed {
                stage: Stage::Install,
                code: None,
                ..
            }
        ));
        assert_eq!(err.to_string(), "install stage of `arm` failed (terminated by signal)");
    }

    #[test]
    fn spawn_error_is_fatal() {
        let work = tempfile::tempdir().unwrap();
        let config = BuildConfig::default();
        let toolchain = toolchain();
        let recorder = Recorder {
            spawn_error: true,
            ..Recorder::default()
        };

        let mut pipeline = Pipeline::new(&config, &toolchain, work.path(), recorder);
        let err = pipeline.run(&mut quiet_shell()).unwrap_err();
        assert!(matches!(err, BuildError::Spawn { stage: Stage::Configure, .. }));
        assert_eq!(pipeline.into_runner().calls.len(), 1);
    }

    #[test]
    fn rerun_reuses_existing_build_dirs() {
        let work = tempfile::tempdir().unwrap();
        let config = BuildConfig::default();
        let toolchain = toolchain();
        std::fs::create_dir_all(work.path().join("build.aarch64")).unwrap();
        std::fs::write(work.path().join("build.aarch64").join("build.ninja"), b"").unwrap();

        for _ in 0..2 {
            let mut pipeline =
                Pipeline::new(&config, &toolchain, work.path(), Recorder::default());
            pipeline.run(&mut quiet_shell()).unwrap();
        }
        assert!(work.path().join("build.aarch64").join("build.ninja").is_file());
    }

    #[test]
    fn configure_sees_its_own_architecture() {
        let work = tempfile::tempdir().unwrap();
        let config = BuildConfig::default();
        let toolchain = toolchain();

        let mut pipeline = Pipeline::new(&config, &toolchain, work.path(), Recorder::default());
        pipeline.run(&mut quiet_shell()).unwrap();

        let seen = pipeline
            .into_runner()
            .calls
            .into_iter()
            .filter(|(stage, _)| *stage == Stage::Configure)
            .map(|(_, cmd)| cmd.env_value("NE10_ANDROID_TARGET_ARCH").map(str::to_string))
            .collect::<Vec<_>>();
        assert_eq!(seen, [Some("aarch64".to_string()), Some("arm".to_string())]);
        assert_eq!(std::env::var_os("NE10_ANDROID_TARGET_ARCH"), None);
    }

    #[test]
    fn dry_run_touches_nothing() {
        let work = tempfile::tempdir().unwrap();
        let config = BuildConfig::default();
        let toolchain = toolchain();

        let mut pipeline = Pipeline::new(&config, &toolchain, work.path(), DryRunRunner);
        pipeline.run(&mut quiet_shell()).unwrap();
        assert!(!work.path().join("build.aarch64").exists());
        assert!(!work.path().join("build.arm").exists());
    }

    #[test]
    fn custom_architecture_table() {
        let work = tempfile::tempdir().unwrap();
        let config = BuildConfig {
            architectures: vec![
                ArchitectureSpec::new("x86_64", ""),
                ArchitectureSpec::new("aarch64", "-DNE10_ENABLE_MATH=ON"),
                ArchitectureSpec::new("arm", "-DNE10_ENABLE_MATH=ON"),
            ],
            ..BuildConfig::default()
        };
        let toolchain = toolchain();

        let mut pipeline = Pipeline::new(&config, &toolchain, work.path(), Recorder::default());
        pipeline.run(&mut quiet_shell()).unwrap();
        assert_eq!(pipeline.into_runner().calls.len(), 9);
        assert!(work.path().join("build.x86_64").is_dir());
    }
}
