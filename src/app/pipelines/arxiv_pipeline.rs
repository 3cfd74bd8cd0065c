use crate::config::toml_config::MonitorConfig;
use crate::core::arxiv::{build_query, ArxivClient, SearchRequest};
use crate::core::code_links::CodeLinkResolver;
use crate::core::pdf::PdfDownloader;
use crate::core::render::{format_row, render_readme, ReadmeSettings};
use crate::core::{last_run, store};
use crate::core::{LoadSummary, Paper, PaperRows, Pipeline, Storage, TransformResult};
use crate::utils::error::Result;
use crate::utils::retry::ExponentialBackoff;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Papers since the last run, capped at `arxiv.max_results`.
    Daily,
    /// Every paper within `arxiv.seed_lookback_days`.
    Seed,
}

/// Fetches new papers for the configured topic and publishes them into the
/// JSON index, the README and the last-run marker.
pub struct ArxivPipeline<S: Storage> {
    pub(crate) storage: S,
    pub(crate) config: MonitorConfig,
    mode: RunMode,
    today: NaiveDate,
    arxiv: ArxivClient,
    code_links: CodeLinkResolver,
    pdfs: PdfDownloader,
}

impl<S: Storage> ArxivPipeline<S> {
    pub fn new(storage: S, config: MonitorConfig, mode: RunMode, today: NaiveDate) -> Result<Self> {
        let arxiv = ArxivClient::new(config.arxiv.clone())?;
        let code_links = CodeLinkResolver::new(config.code_links.clone())?;
        let pdfs = PdfDownloader::new(config.pdf.clone(), config.output.data_dir.clone())?;
        Ok(Self {
            storage,
            config,
            mode,
            today,
            arxiv,
            code_links,
            pdfs,
        })
    }

    /// Replaces the configured backoff for both lookups and downloads.
    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.code_links = self.code_links.with_backoff(backoff.clone());
        self.pdfs = self.pdfs.with_backoff(backoff);
        self
    }

    pub async fn start_date(&self) -> Result<NaiveDate> {
        match self.mode {
            RunMode::Seed => last_run::lookback_start(
                self.today,
                self.config.arxiv.seed_lookback_days,
                "arxiv.seed_lookback_days",
            ),
            RunMode::Daily => {
                last_run::read_last_run(
                    &self.storage,
                    &self.config.output.last_run,
                    self.today,
                    self.config.arxiv.default_lookback_days,
                )
                .await
            }
        }
    }

    pub fn search_request(&self, start_date: NaiveDate) -> SearchRequest {
        SearchRequest {
            query: build_query(
                &self.config.topic.query,
                &self.config.arxiv.categories,
                start_date,
                self.today,
            ),
            start_date,
            max_results: match self.mode {
                RunMode::Daily => Some(self.config.arxiv.max_results),
                RunMode::Seed => None,
            },
        }
    }

    async fn enrich(&self, paper: &mut Paper) {
        paper.code_url = self.code_links.lookup(&paper.id).await;

        if self.pdfs.is_enabled() {
            match self
                .pdfs
                .download(&self.storage, &paper.pdf_url(), &paper.title)
                .await
            {
                Ok(Some(_)) => {
                    tokio::time::sleep(self.config.pdf.post_download_delay()).await;
                }
                Ok(None) => {}
                Err(e) => tracing::error!("Failed to download PDF for {}: {}", paper.title, e),
            }
        }

        tracing::info!("New paper: {} ({})", paper.title, paper.updated);
    }

    async fn checkpoint(&self, papers: &[Paper]) -> Result<()> {
        tracing::info!(
            "Processed {} papers; updating the index incrementally",
            papers.len()
        );
        store::merge_into_index(
            &self.storage,
            &self.config.output.index,
            &self.config.topic.name,
            rows_for(papers),
        )
        .await?;
        Ok(())
    }
}

fn rows_for(papers: &[Paper]) -> PaperRows {
    papers
        .iter()
        .map(|paper| (paper.id.clone(), format_row(paper)))
        .collect()
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for ArxivPipeline<S> {
    async fn extract(&self) -> Result<Vec<Paper>> {
        let start_date = self.start_date().await?;
        match self.mode {
            RunMode::Seed => tracing::info!("Seeding with papers since {}", start_date),
            RunMode::Daily => tracing::info!("Updating with papers since {}", start_date),
        }

        let request = self.search_request(start_date);
        tracing::debug!("arXiv query: {}", request.query);

        let mut papers = self.arxiv.search(&request).await;
        let checkpoint_every = self.config.arxiv.seed_checkpoint_every;

        for i in 0..papers.len() {
            self.enrich(&mut papers[i]).await;

            let processed = i + 1;
            if self.mode == RunMode::Seed && checkpoint_every > 0 && processed % checkpoint_every == 0
            {
                self.checkpoint(&papers[..processed]).await?;
            }
        }

        Ok(papers)
    }

    async fn transform(&self, papers: Vec<Paper>) -> Result<TransformResult> {
        Ok(TransformResult {
            topic: self.config.topic.name.clone(),
            rows: rows_for(&papers),
        })
    }

    async fn load(&self, result: TransformResult) -> Result<LoadSummary> {
        let (index, new_rows) = store::merge_into_index(
            &self.storage,
            &self.config.output.index,
            &result.topic,
            result.rows,
        )
        .await?;
        let total_rows = index.values().map(|rows| rows.len()).sum();

        let settings = ReadmeSettings {
            description: &self.config.topic.description,
            github_repo: &self.config.output.github_repo,
            seed_lookback_days: self.config.arxiv.seed_lookback_days,
        };
        let readme = render_readme(&index, self.today, &settings);
        self.storage
            .write_file(&self.config.output.readme, readme.as_bytes())
            .await?;
        tracing::info!("Markdown generated");

        last_run::write_last_run(&self.storage, &self.config.output.last_run, self.today).await?;

        Ok(LoadSummary {
            new_rows,
            total_rows,
            readme_path: self.config.output.readme.clone(),
        })
    }
}
