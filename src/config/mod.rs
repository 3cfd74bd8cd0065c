pub mod cli;
pub mod toml_config;

pub use toml_config::MonitorConfig;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "arxiv-monitor")]
#[command(about = "Monitor arXiv for new papers on a topic and publish them as a README table")]
pub struct CliConfig {
    /// Path to a TOML configuration file (defaults to ./arxiv-monitor.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory the output paths are relative to
    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,

    /// Seed the index with the configured lookback (run once, then omit)
    #[arg(long)]
    pub seed: bool,

    /// Skip PDF downloads
    #[arg(long)]
    pub no_pdf: bool,

    /// Skip Semantic Scholar code link lookups
    #[arg(long)]
    pub no_code_links: bool,

    /// Show the query that would run without touching the network or files
    #[arg(long)]
    pub dry_run: bool,

    /// Emit JSON log lines instead of the console format
    #[arg(long)]
    pub json_logs: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Command line switches win over the file.
    pub fn apply_overrides(&self, config: &mut MonitorConfig) {
        if self.no_pdf {
            config.pdf.enabled = false;
        }
        if self.no_code_links {
            config.code_links.enabled = false;
        }
    }
}
