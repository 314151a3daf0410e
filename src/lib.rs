pub mod cli;
pub mod cmake;
pub mod config;
pub mod error;
pub mod ndk;
pub mod pipeline;
pub mod shell;
