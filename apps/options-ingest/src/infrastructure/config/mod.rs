//! Configuration Module
//!
//! Command-line parsing and the validated settings each pipeline runs with.

mod cli;
mod dotenv;
mod settings;

pub use cli::{Cli, Command, ReplayArgs, StreamArgs};
pub use dotenv::{load_dotenv, load_dotenv_from};
pub use settings::{
    ConfigError, MetricsSettings, ReplaySettings, StreamSettings, buffer_settings_from_env,
    normalize_symbols,
};
