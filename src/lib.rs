pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::pipelines::{ArxivPipeline, RunMode};
pub use config::{cli::LocalStorage, MonitorConfig};
pub use core::etl::{MonitorEngine, RunSummary};
pub use utils::error::{MonitorError, Result};
