use crate::utils::error::{MonitorError, Result};
use crate::utils::retry::ExponentialBackoff;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "arxiv-monitor.toml";

/// Upper bound for both lookbacks, about a century.
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

const DEFAULT_USER_AGENT: &str = "arxiv.py/2.1.3";

const DEFAULT_QUERY: &str = r#"all:"task oriented dialogue" OR all:"task oriented dialog" OR all:"TOD system" OR all:"task-oriented dialog""#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub topic: TopicConfig,
    pub arxiv: ArxivConfig,
    pub code_links: CodeLinksConfig,
    pub pdf: PdfConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub name: String,
    pub query: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArxivConfig {
    pub endpoint: String,
    pub categories: Vec<String>,
    pub page_size: usize,
    /// Cap on papers per daily run; seeding is unbounded.
    pub max_results: usize,
    pub page_delay_secs: f64,
    pub page_retries: u32,
    /// Large pages are slow to serve, so this is longer than the other clients.
    pub timeout_secs: u64,
    pub user_agent: String,
    pub seed_lookback_days: i64,
    pub default_lookback_days: i64,
    /// While seeding, merge into the index after this many papers.
    pub seed_checkpoint_every: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeLinksConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub enabled: bool,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
    pub post_download_delay_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub readme: String,
    pub index: String,
    pub last_run: String,
    pub data_dir: String,
    pub logs_dir: String,
    pub github_repo: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            name: "Task Oriented Dialogue Systems".to_string(),
            query: DEFAULT_QUERY.to_string(),
            description: "This repository tracks Arxiv papers on Task Oriented Dialogue Systems."
                .to_string(),
        }
    }
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://export.arxiv.org/api/query".to_string(),
            categories: [
                "cs.CL", "cs.LG", "cs.AI", "cs.HC", "cs.IR", "cs.SD", "cs.MA", "cs.DC", "cs.SI",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            page_size: 100,
            max_results: 50,
            page_delay_secs: 3.0,
            page_retries: 5,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            seed_lookback_days: 1825,
            default_lookback_days: 7,
            seed_checkpoint_every: 100,
        }
    }
}

impl Default for CodeLinksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.semanticscholar.org".to_string(),
            timeout_secs: 10,
            max_attempts: 5,
            min_delay_secs: 4.0,
            max_delay_secs: 60.0,
        }
    }
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
            max_attempts: 3,
            min_delay_secs: 4.0,
            max_delay_secs: 10.0,
            post_download_delay_secs: 4.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            readme: "README.md".to_string(),
            index: "docs/arxiv-daily.json".to_string(),
            last_run: "docs/last_run.txt".to_string(),
            data_dir: "data".to_string(),
            logs_dir: "logs".to_string(),
            github_repo: "dowwie/daily_tods".to_string(),
        }
    }
}

impl CodeLinksConfig {
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            self.max_attempts,
            secs(self.min_delay_secs),
            secs(self.max_delay_secs),
        )
    }
}

impl PdfConfig {
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            self.max_attempts,
            secs(self.min_delay_secs),
            secs(self.max_delay_secs),
        )
    }

    pub fn post_download_delay(&self) -> Duration {
        secs(self.post_download_delay_secs)
    }
}

impl ArxivConfig {
    pub fn page_delay(&self) -> Duration {
        secs(self.page_delay_secs)
    }
}

/// Negative or non-finite values count as zero; validation reports them.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl MonitorConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Reads `path` when given; otherwise the default file if present, else built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MonitorError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR_NAME}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MonitorError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("topic.name", &self.topic.name)?;
        validation::validate_non_empty_string("topic.query", &self.topic.query)?;

        validation::validate_url("arxiv.endpoint", &self.arxiv.endpoint)?;
        validation::validate_positive_number("arxiv.page_size", self.arxiv.page_size, 1)?;
        validation::validate_positive_number("arxiv.max_results", self.arxiv.max_results, 1)?;
        if self.arxiv.categories.is_empty() {
            return Err(MonitorError::MissingConfigError {
                field: "arxiv.categories".to_string(),
            });
        }
        for category in &self.arxiv.categories {
            validation::validate_category("arxiv.categories", category)?;
        }
        validate_secs("arxiv.page_delay_secs", self.arxiv.page_delay_secs)?;
        validation::validate_non_empty_string("arxiv.user_agent", &self.arxiv.user_agent)?;
        validate_lookback("arxiv.seed_lookback_days", self.arxiv.seed_lookback_days)?;
        validate_lookback("arxiv.default_lookback_days", self.arxiv.default_lookback_days)?;

        if self.code_links.enabled {
            validation::validate_url("code_links.endpoint", &self.code_links.endpoint)?;
        }
        validate_secs("code_links.min_delay_secs", self.code_links.min_delay_secs)?;
        validate_secs("code_links.max_delay_secs", self.code_links.max_delay_secs)?;
        validation::validate_ordered(
            "code_links.delay_secs",
            self.code_links.min_delay_secs,
            self.code_links.max_delay_secs,
        )?;

        validate_secs("pdf.min_delay_secs", self.pdf.min_delay_secs)?;
        validate_secs("pdf.max_delay_secs", self.pdf.max_delay_secs)?;
        validate_secs("pdf.post_download_delay_secs", self.pdf.post_download_delay_secs)?;
        validation::validate_ordered(
            "pdf.delay_secs",
            self.pdf.min_delay_secs,
            self.pdf.max_delay_secs,
        )?;

        validation::validate_path("output.readme", &self.output.readme)?;
        validation::validate_path("output.index", &self.output.index)?;
        validation::validate_path("output.last_run", &self.output.last_run)?;
        validation::validate_path("output.data_dir", &self.output.data_dir)?;
        validation::validate_path("output.logs_dir", &self.output.logs_dir)?;
        validation::validate_non_empty_string("output.github_repo", &self.output.github_repo)?;

        Ok(())
    }
}

fn validate_secs(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(MonitorError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Delay must be a non-negative number of seconds".to_string(),
        });
    }
    Ok(())
}

fn validate_lookback(field: &str, days: i64) -> Result<()> {
    if !(0..=MAX_LOOKBACK_DAYS).contains(&days) {
        return Err(MonitorError::InvalidConfigValueError {
            field: field.to_string(),
            value: days.to_string(),
            reason: format!("Lookback must be between 0 and {} days", MAX_LOOKBACK_DAYS),
        });
    }
    Ok(())
}

impl Validate for MonitorConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
