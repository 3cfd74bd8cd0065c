use crate::config::toml_config::PdfConfig;
use crate::domain::ports::Storage;
use crate::utils::error::{MonitorError, Result};
use crate::utils::retry::{retry_async, ExponentialBackoff};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

pub struct PdfDownloader {
    client: Client,
    config: PdfConfig,
    data_dir: String,
    backoff: ExponentialBackoff,
}

impl PdfDownloader {
    pub fn new(config: PdfConfig, data_dir: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let backoff = config.backoff();
        Ok(Self {
            client,
            config,
            data_dir: data_dir.into(),
            backoff,
        })
    }

    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn target_path(&self, title: &str) -> String {
        format!(
            "{}/{}.pdf",
            self.data_dir.trim_end_matches('/'),
            sanitize_filename(title)
        )
    }

    /// Saves the PDF under the data directory and returns its path. Responses
    /// that are not PDFs are skipped with `Ok(None)`; transient failures are
    /// retried before giving up and other HTTP errors fail at once.
    pub async fn download<S: Storage>(
        &self,
        storage: &S,
        pdf_url: &str,
        title: &str,
    ) -> Result<Option<String>> {
        retry_async(
            &self.backoff,
            "PDF download",
            |_| self.download_once(storage, pdf_url, title),
            MonitorError::is_retryable,
        )
        .await
    }

    async fn download_once<S: Storage>(
        &self,
        storage: &S,
        pdf_url: &str,
        title: &str,
    ) -> Result<Option<String>> {
        tracing::debug!("Attempting to download PDF from: {}", pdf_url);

        let mut response = self
            .client
            .get(pdf_url)
            .header(USER_AGENT, &self.config.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::HttpStatusError {
                status: status.as_u16(),
                url: pdf_url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_pdf(&content_type) {
            tracing::error!(
                "Unexpected content-type for {}: {}",
                pdf_url,
                if content_type.is_empty() { "<none>" } else { content_type.as_str() }
            );
            return Ok(None);
        }

        let path = self.target_path(title);
        storage.write_file(&path, &[]).await?;
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await? {
            storage.append_file(&path, &chunk).await?;
            written += chunk.len();
        }

        tracing::info!("PDF saved successfully at: {} ({} bytes)", path, written);
        Ok(Some(path))
    }
}

fn is_pdf(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/pdf"))
        .unwrap_or(false)
}

/// Keeps alphanumerics, spaces and `._-`; everything else becomes `_`.
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
