use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ndk::HostOs;
use crate::pipeline::Stage;

/// A required toolchain component could not be located.
#[derive(Error, Debug)]
pub enum ToolchainError {
    #[error("no Android SDK location is known for host OS `{host}`")]
    UnsupportedHost { host: HostOs },

    #[error("Android SDK not found at {}", expected.display())]
    SdkNotFound { host: HostOs, expected: PathBuf },

    #[error("NDK not installed in Android SDK at {}", sdk_root.display())]
    NdkNotInstalled { sdk_root: PathBuf },

    #[error("cmake not installed in Android SDK at {}", sdk_root.display())]
    CmakeNotInstalled { sdk_root: PathBuf },
}

/// A per-architecture build stage could not complete.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("failed to create build directory {}", path.display())]
    BuildDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch `{program}` for the {stage} stage of `{arch}`")]
    Spawn {
        arch: String,
        stage: Stage,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{stage} stage of `{arch}` failed ({})", describe_code(*code))]
    StageFailed {
        arch: String,
        stage: Stage,
        code: Option<i32>,
    },
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status: {code}"),
        None => "terminated by signal".to_string(),
    }
}
