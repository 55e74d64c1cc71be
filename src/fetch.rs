use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom as _;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

use crate::error::{Result, ScrapeError};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

/// A browser user agent, picked independently on every call.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let user_agent = random_user_agent();
        tracing::debug!(%url, user_agent, "GET");

        let network = |source| ScrapeError::Network {
            url: url.to_owned(),
            source,
        };

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "zh-TW,zh;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_owned(),
                status,
            });
        }

        response.text().await.map_err(network)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Nothing listens on the discard port locally.
    pub(crate) const CLOSED_PORT_URL: &str = "http://127.0.0.1:9/";

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() -> anyhow::Result<()> {
        let fetcher = HttpFetcher::new(Duration::from_secs(5))?;
        let err = fetcher.fetch(CLOSED_PORT_URL).await.unwrap_err();

        assert!(err.is_network());
        assert!(
            matches!(err, ScrapeError::Network { ref url, .. } if url == CLOSED_PORT_URL),
            "expected transport failure, got {err:?}"
        );
        Ok(())
    }

    #[test]
    fn random_user_agent_comes_from_the_pool() {
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }
}
