use crate::config::toml_config::CodeLinksConfig;
use crate::utils::error::{MonitorError, Result};
use crate::utils::retry::{retry_async, ExponentialBackoff};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Looks up the official code repository Semantic Scholar links to a paper.
pub struct CodeLinkResolver {
    client: Client,
    config: CodeLinksConfig,
    backoff: ExponentialBackoff,
}

impl CodeLinkResolver {
    pub fn new(config: CodeLinksConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let backoff = config.backoff();
        Ok(Self {
            client,
            config,
            backoff,
        })
    }

    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Never fails the run: rate limits are retried, anything else yields None.
    pub async fn lookup(&self, paper_id: &str) -> Option<String> {
        if !self.config.enabled {
            return None;
        }

        let result = retry_async(
            &self.backoff,
            "Semantic Scholar lookup",
            |_| self.fetch_once(paper_id),
            MonitorError::is_rate_limited,
        )
        .await;

        match result {
            Ok(url) => url,
            Err(MonitorError::HttpStatusError { status: 429, .. }) => {
                tracing::warn!("Rate limited looking up code for {}; giving up", paper_id);
                None
            }
            Err(e) => {
                tracing::warn!("Code lookup failed for {}: {}", paper_id, e);
                None
            }
        }
    }

    async fn fetch_once(&self, paper_id: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/v1/paper/arXiv:{}",
            self.config.endpoint.trim_end_matches('/'),
            paper_id
        );
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            if let Some(wait) = retry_after {
                tracing::info!("Rate limited for {}. Waiting {}s.", paper_id, wait);
                tokio::time::sleep(Duration::from_secs(wait)).await;
            }
            return Err(MonitorError::HttpStatusError {
                status: status.as_u16(),
                url,
            });
        }

        if !status.is_success() {
            return Err(MonitorError::HttpStatusError {
                status: status.as_u16(),
                url,
            });
        }

        let body: serde_json::Value = response.json().await?;
        Ok(official_url(&body))
    }
}

fn official_url(body: &serde_json::Value) -> Option<String> {
    body.pointer("/official/url")
        .and_then(|value| value.as_str())
        .map(str::trim)
        .filter(|url| !url.is_empty() && *url != "null")
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn resolver(server: &MockServer, max_attempts: u32) -> CodeLinkResolver {
        let config = CodeLinksConfig {
            endpoint: server.base_url(),
            max_attempts,
            ..CodeLinksConfig::default()
        };
        CodeLinkResolver::new(config)
            .unwrap()
            .with_backoff(ExponentialBackoff::immediate(max_attempts))
    }

    #[test]
    fn test_official_url_extraction() {
        let body = serde_json::json!({"official": {"url": "https://github.com/org/repo"}});
        assert_eq!(
            official_url(&body).as_deref(),
            Some("https://github.com/org/repo")
        );
        assert_eq!(official_url(&serde_json::json!({"title": "x"})), None);
        assert_eq!(official_url(&serde_json::json!({"official": {"url": ""}})), None);
    }

    #[tokio::test]
    async fn test_lookup_returns_official_url() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/paper/arXiv:2401.00001");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "title": "Paper",
                    "official": {"url": "https://github.com/org/tod"}
                }));
        });

        let url = resolver(&server, 5).lookup("2401.00001").await;

        mock.assert();
        assert_eq!(url.as_deref(), Some("https://github.com/org/tod"));
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/paper/arXiv:2401.00002");
            then.status(404);
        });

        let url = resolver(&server, 5).lookup("2401.00002").await;

        assert_eq!(mock.hits(), 1);
        assert!(url.is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_retries_then_gives_up() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/paper/arXiv:2401.00003");
            then.status(429).header("Retry-After", "0");
        });

        let url = resolver(&server, 3).lookup("2401.00003").await;

        assert_eq!(mock.hits(), 3);
        assert!(url.is_none());
    }

    #[tokio::test]
    async fn test_retry_after_is_honoured() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/paper/arXiv:2401.00005");
            then.status(429).header("Retry-After", "1");
        });

        let started = std::time::Instant::now();
        let url = resolver(&server, 2).lookup("2401.00005").await;

        assert_eq!(mock.hits(), 2);
        assert!(url.is_none());
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_disabled_resolver_makes_no_requests() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET);
            then.status(200);
        });

        let config = CodeLinksConfig {
            enabled: false,
            endpoint: server.base_url(),
            ..CodeLinksConfig::default()
        };
        let url = CodeLinkResolver::new(config)
            .unwrap()
            .lookup("2401.00004")
            .await;

        assert_eq!(mock.hits(), 0);
        assert!(url.is_none());
    }
}
