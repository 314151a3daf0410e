use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

use termcolor::Color;

use crate::error::ToolchainError;
use crate::shell::Shell;

#[cfg(target_os = "windows")]
const BIN_EXT: &str = ".exe";
#[cfg(not(target_os = "windows"))]
const BIN_EXT: &str = "";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    MacOs,
    Other(String),
}

impl HostOs {
    pub fn current() -> HostOs {
        HostOs::from_os_name(std::env::consts::OS)
    }

    /// Maps a `std::env::consts::OS` style name.
    pub fn from_os_name(name: &str) -> HostOs {
        match name {
            "windows" => HostOs::Windows,
            "macos" => HostOs::MacOs,
            other => HostOs::Other(other.to_string()),
        }
    }

    /// Where Android Studio installs the SDK, relative to the home directory.
    pub fn sdk_relative_path(&self) -> Option<PathBuf> {
        let parts: &[&str] = match self {
            HostOs::Windows => &["AppData", "Local", "Android", "Sdk"],
            HostOs::MacOs => &["Library", "Android", "sdk"],
            HostOs::Other(_) => return None,
        };
        Some(parts.iter().collect())
    }
}

impl Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HostOs::Windows => "windows",
            HostOs::MacOs => "macos",
            HostOs::Other(name) => name,
        })
    }
}

/// What was found under the SDK root. Absent components are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainDiscovery {
    pub host: HostOs,
    /// The SDK location for this host, whether or not it exists.
    pub sdk_candidate: Option<PathBuf>,
    pub sdk_root: Option<PathBuf>,
    pub ndk_path: Option<PathBuf>,
    pub cmake_path: Option<PathBuf>,
}

impl ToolchainDiscovery {
    fn empty(host: HostOs, sdk_candidate: Option<PathBuf>) -> Self {
        ToolchainDiscovery {
            host,
            sdk_candidate,
            sdk_root: None,
            ndk_path: None,
            cmake_path: None,
        }
    }

    /// Checks that every component needed for a build was found.
    pub fn validate(&self) -> Result<Toolchain, ToolchainError> {
        let sdk_root = match (&self.sdk_root, &self.sdk_candidate) {
            (Some(root), _) => root.clone(),
            (None, Some(expected)) => {
                return Err(ToolchainError::SdkNotFound {
                    host: self.host.clone(),
                    expected: expected.clone(),
                });
            }
            (None, None) => {
                return Err(ToolchainError::UnsupportedHost {
                    host: self.host.clone(),
                });
            }
        };

        let ndk = self
            .ndk_path
            .clone()
            .ok_or_else(|| ToolchainError::NdkNotInstalled {
                sdk_root: sdk_root.clone(),
            })?;
        let cmake = self
            .cmake_path
            .clone()
            .ok_or_else(|| ToolchainError::CmakeNotInstalled {
                sdk_root: sdk_root.clone(),
            })?;

        Ok(Toolchain {
            sdk_root,
            ndk,
            cmake,
        })
    }
}

/// A discovery with every component present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub sdk_root: PathBuf,
    pub ndk: PathBuf,
    pub cmake: PathBuf,
}

impl Toolchain {
    pub fn cmake_bin(&self) -> PathBuf {
        self.cmake.join("bin").join(format!("cmake{BIN_EXT}"))
    }

    /// The ninja shipped alongside the SDK's cmake, if that package has one.
    pub fn bundled_ninja(&self) -> Option<PathBuf> {
        let ninja = self.cmake.join("bin").join(format!("ninja{BIN_EXT}"));
        ninja.is_file().then_some(ninja)
    }

    pub fn toolchain_file(&self) -> PathBuf {
        self.ndk
            .join("build")
            .join("cmake")
            .join("android.toolchain.cmake")
    }
}

/// Picks the greatest child directory by name. This is a plain string
/// comparison, so "9.0" sorts after "23.1".
fn latest_version_in(dir: &Path) -> Option<PathBuf> {
    let mut versions = std::fs::read_dir(dir)
        .ok()?
        .flat_map(Result::ok)
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect::<Vec<_>>();

    versions.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    versions.pop()
}

fn probe(sdk_root: &Path, component: &str, shell: &mut Shell) -> Option<PathBuf> {
    let dir = sdk_root.join(component);
    if !dir.is_dir() {
        let _ = shell.warn(format!("{component} not installed"));
        return None;
    }

    let _ = shell.very_verbose(|shell| {
        shell.status_with_color(
            "Scanning",
            format!("{component} versions in {}", dir.display()),
            Color::Cyan,
        )
    });

    let found = latest_version_in(&dir);
    match &found {
        Some(path) => {
            let _ = shell.verbose(|shell| {
                shell.status_with_color(
                    "Found",
                    format!("{component} at {}", path.display()),
                    Color::Cyan,
                )
            });
        }
        None => {
            let _ = shell.warn(format!("no {component} versions in {}", dir.display()));
        }
    }
    found
}

/// Locates the SDK, NDK and cmake for `host` below `home`.
///
/// Never fails: missing pieces are reported as warnings and left as `None`.
/// Use [`ToolchainDiscovery::validate`] before building anything with it.
pub fn discover(host: HostOs, home: &Path, shell: &mut Shell) -> ToolchainDiscovery {
    let sdk_candidate = host.sdk_relative_path().map(|rel| home.join(rel));

    let sdk_root = match &sdk_candidate {
        Some(path) if path.is_dir() => path.clone(),
        _ => return ToolchainDiscovery::empty(host, sdk_candidate),
    };

    let _ = shell.verbose(|shell| {
        shell.status_with_color(
            "Found",
            format!("Android SDK at {}", sdk_root.display()),
            Color::Cyan,
        )
    });

    let ndk_path = probe(&sdk_root, "ndk", shell);
    let cmake_path = probe(&sdk_root, "cmake", shell);

    ToolchainDiscovery {
        host,
        sdk_candidate,
        sdk_root: Some(sdk_root),
        ndk_path,
        cmake_path,
    }
}
