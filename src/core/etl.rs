use crate::core::Pipeline;
use crate::utils::error::Result;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub fetched: usize,
    pub new_rows: usize,
    pub total_rows: usize,
    pub readme_path: String,
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fetched {} papers ({} new, {} in index) in {:.1}s; README written to {}",
            self.fetched,
            self.new_rows,
            self.total_rows,
            self.elapsed.as_secs_f64(),
            self.readme_path
        )
    }
}

pub struct MonitorEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> MonitorEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        tracing::info!("Starting arXiv tracking");

        let papers = self.pipeline.extract().await?;
        let fetched = papers.len();
        tracing::info!(
            "Fetched {} papers in {:.2}s",
            fetched,
            started.elapsed().as_secs_f64()
        );

        let transformed = self.pipeline.transform(papers).await?;
        tracing::debug!("Rendered {} rows for '{}'", transformed.rows.len(), transformed.topic);

        let loaded = self.pipeline.load(transformed).await?;
        tracing::info!(
            "Index updated: {} new, {} total; README written to {}",
            loaded.new_rows,
            loaded.total_rows,
            loaded.readme_path
        );

        let elapsed = started.elapsed();
        tracing::info!("Process completed in {:.2}s", elapsed.as_secs_f64());

        Ok(RunSummary {
            fetched,
            new_rows: loaded.new_rows,
            total_rows: loaded.total_rows,
            readme_path: loaded.readme_path,
            elapsed,
        })
    }
}
