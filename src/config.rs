use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "android-build.toml";

/// One architecture to build, with the extra cmake flag it needs.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ArchitectureSpec {
    pub name: String,
    #[serde(default)]
    pub extra_flag: String,
}

impl ArchitectureSpec {
    pub fn new(name: &str, extra_flag: &str) -> Self {
        ArchitectureSpec {
            name: name.to_string(),
            extra_flag: extra_flag.to_string(),
        }
    }
}

/// A `-D<name>=<value>` cmake cache entry.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Define {
    pub name: String,
    pub value: String,
}

impl Define {
    pub fn new(name: &str, value: &str) -> Self {
        Define {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn to_arg(&self) -> String {
        format!("-D{}={}", self.name, self.value)
    }
}

pub(crate) fn default_architectures() -> Vec<ArchitectureSpec> {
    vec![
        ArchitectureSpec::new("aarch64", "-DNE10_ENABLE_MATH=ON"),
        ArchitectureSpec::new("arm", "-DNE10_ENABLE_MATH=ON"),
    ]
}

pub(crate) fn default_defines() -> Vec<Define> {
    vec![
        Define::new("ANDROID_ARM_NEON", "ON"),
        Define::new("NE10_BUILD_EXAMPLES", "ON"),
        Define::new("NE10_BUILD_UNIT_TEST", "OFF"),
        Define::new("ANDROID_DEMO", "OFF"),
        Define::new("NE10_ENABLE_IMGPROC", "OFF"),
        Define::new("NE10_ASM_OPTIMIZATION", "OFF"),
        Define::new("NE10_ENABLE_PHYSICS", "OFF"),
    ]
}

fn default_platform() -> u8 {
    33
}

fn default_generator() -> String {
    "Ninja".to_string()
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("..")
}

fn default_build_dir_prefix() -> String {
    "build".to_string()
}

fn default_arch_env_var() -> String {
    "NE10_ANDROID_TARGET_ARCH".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Android API level used in the toolchain name.
    #[serde(default = "default_platform")]
    pub platform: u8,

    #[serde(default = "default_generator")]
    pub generator: String,

    /// Build tool for the build and install stages. Falls back to the
    /// SDK's bundled ninja, then `ninja` on `PATH`.
    #[serde(default)]
    pub make_program: Option<PathBuf>,

    /// Source tree, relative to each build directory.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    #[serde(default = "default_build_dir_prefix")]
    pub build_dir_prefix: String,

    /// Passed to the configure stage with the architecture name as value.
    #[serde(default = "default_arch_env_var")]
    pub arch_env_var: String,

    #[serde(default = "default_defines")]
    pub defines: Vec<Define>,

    #[serde(default = "default_architectures")]
    pub architectures: Vec<ArchitectureSpec>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            platform: default_platform(),
            generator: default_generator(),
            make_program: None,
            source_dir: default_source_dir(),
            build_dir_prefix: default_build_dir_prefix(),
            arch_env_var: default_arch_env_var(),
            defines: default_defines(),
            architectures: default_architectures(),
        }
    }
}

impl BuildConfig {
    pub fn from_toml(input: &str) -> anyhow::Result<BuildConfig> {
        let config: BuildConfig = toml::from_str(input)?;
        if config.architectures.is_empty() {
            anyhow::bail!("`architectures` must list at least one architecture");
        }
        Ok(config)
    }

    /// `build.<arch>` below `work_dir`.
    pub fn build_dir(&self, work_dir: &Path, arch: &ArchitectureSpec) -> PathBuf {
        work_dir.join(format!("{}.{}", self.build_dir_prefix, arch.name))
    }

    pub fn toolchain_name(&self, arch: &ArchitectureSpec) -> String {
        format!("{}-linux-android-{}", arch.name, self.platform)
    }
}

/// Loads `path`, or `android-build.toml` in `work_dir` if it exists, or the
/// built-in defaults.
pub fn load(path: Option<&Path>, work_dir: &Path) -> anyhow::Result<BuildConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let path = work_dir.join(CONFIG_FILE_NAME);
            if !path.is_file() {
                return Ok(BuildConfig::default());
            }
            path
        }
    };

    let input = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    BuildConfig::from_toml(&input).with_context(|| format!("failed to parse {}", path.display()))
}
