//! Capy CLI — facet correlation statistics from the command line.

pub mod commands;
pub mod config;
pub mod render;

pub use commands::{execute, Command, Common};
pub use config::{resolve_endpoint, resolve_timeout_ms};
pub use render::OutputFormat;
