use crate::config::toml_config::ArxivConfig;
use crate::core::atom::{self, AtomFeed};
use crate::domain::model::Paper;
use crate::utils::error::{MonitorError, Result};
use crate::utils::retry::{retry_async, ExponentialBackoff};
use chrono::NaiveDate;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use std::time::Duration;

/// Search window and limits for one run.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub start_date: NaiveDate,
    /// None fetches every matching paper.
    pub max_results: Option<usize>,
}

/// `({query}) AND (cat:a OR cat:b) AND submittedDate:[start TO end]`
pub fn build_query(
    topic_query: &str,
    categories: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    let cat_query = categories
        .iter()
        .map(|cat| format!("cat:{}", cat))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!(
        "({}) AND ({}) AND submittedDate:[{} TO {}]",
        topic_query,
        cat_query,
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    )
}

pub struct ArxivClient {
    client: Client,
    config: ArxivConfig,
}

impl ArxivClient {
    pub fn new(config: ArxivConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Pages through the results newest first, keeping papers updated on or
    /// after the start date. Failures after the first page end the search with
    /// whatever was collected so far.
    pub async fn search(&self, request: &SearchRequest) -> Vec<Paper> {
        let mut papers = Vec::new();
        let limit = request.max_results;

        let mut feed = match self.fetch_page_with_retries(&request.query, 0, true).await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::error!("Failed to fetch first page: {}", e);
                return papers;
            }
        };

        if feed.entries.is_empty() {
            tracing::info!("Got empty first page; stopping");
            return papers;
        }

        let total_results = feed.total_results;
        tracing::info!(
            "Got first page: {} of {} total results",
            feed.entries.len(),
            total_results
        );

        let mut offset = 0;
        'pages: loop {
            let page_len = feed.entries.len();
            for entry in feed.entries {
                match entry.into_paper() {
                    Ok(paper) if paper.updated >= request.start_date => {
                        papers.push(paper);
                        if limit.is_some_and(|max| papers.len() >= max) {
                            break 'pages;
                        }
                    }
                    Ok(paper) => {
                        tracing::debug!(
                            "Skipping {} updated {} before {}",
                            paper.id,
                            paper.updated,
                            request.start_date
                        );
                    }
                    Err(e) => tracing::warn!("Skipping partial result: {}", e),
                }
            }

            offset += page_len;
            if offset >= total_results {
                tracing::info!("Reached total results: {}", total_results);
                break;
            }

            tokio::time::sleep(self.config.page_delay()).await;
            feed = match self
                .fetch_page_with_retries(&request.query, offset, false)
                .await
            {
                Ok(feed) => feed,
                Err(MonitorError::UnexpectedEmptyPage { offset }) => {
                    tracing::info!(
                        "Encountered empty page at offset {}; treating as end of results",
                        offset
                    );
                    break;
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to fetch page at offset {}: {}. Stopping with collected results.",
                        offset,
                        e
                    );
                    break;
                }
            };
        }

        papers
    }

    /// Non-first pages that come back empty are retried like other transient
    /// failures; a rejected request (4xx other than 429) is not.
    async fn fetch_page_with_retries(
        &self,
        query: &str,
        offset: usize,
        first_page: bool,
    ) -> Result<AtomFeed> {
        let delay = self.config.page_delay();
        let strategy = ExponentialBackoff::new(self.config.page_retries + 1, delay, delay);

        retry_async(
            &strategy,
            "arXiv page fetch",
            |_| async move {
                let feed = self.fetch_page(query, offset).await?;
                if feed.entries.is_empty() && !first_page {
                    return Err(MonitorError::UnexpectedEmptyPage { offset });
                }
                Ok(feed)
            },
            MonitorError::is_retryable,
        )
        .await
    }

    async fn fetch_page(&self, query: &str, offset: usize) -> Result<AtomFeed> {
        let params = [
            ("search_query", query.to_string()),
            ("id_list", String::new()),
            ("sortBy", "submittedDate".to_string()),
            ("sortOrder", "descending".to_string()),
            ("start", offset.to_string()),
            ("max_results", self.config.page_size.to_string()),
        ];

        tracing::debug!(
            "Requesting {} (start={}, max_results={})",
            self.config.endpoint,
            offset,
            self.config.page_size
        );
        let response = self
            .client
            .get(&self.config.endpoint)
            .header(USER_AGENT, &self.config.user_agent)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::HttpStatusError {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let body = response.text().await?;
        let feed = atom::parse_feed(&body)?;

        if let Some(error_entry) = feed.entries.iter().find(|entry| entry.is_api_error()) {
            return Err(MonitorError::ProcessingError {
                message: format!(
                    "arXiv rejected the query: {}",
                    error_entry.summary.as_deref().unwrap_or("unknown error")
                ),
            });
        }

        Ok(feed)
    }
}
