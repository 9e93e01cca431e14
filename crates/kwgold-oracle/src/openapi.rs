use async_trait::async_trait;
use kwgold_core::{
    DocumentCountSource, Keyword, KwGoldError, OpenApiCredentials, OracleConfig, Result,
    RetryPolicy,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

const BLOG_SEARCH_URL: &str = "https://openapi.naver.com/v1/search/blog";

/// Document-count oracle backed by the blog search endpoint: one result
/// requested, only the `total` field read. Queries use the original
/// keyword string, spacing included.
pub struct OpenApiClient {
    client: Client,
    credentials: OpenApiCredentials,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct BlogSearchResponse {
    #[serde(default)]
    total: u64,
}

impl OpenApiClient {
    pub fn new(config: &OracleConfig, credentials: OpenApiCredentials) -> Result<Self> {
        if credentials.client_id.is_empty() || credentials.client_secret.is_empty() {
            return Err(KwGoldError::Config(
                "open-api credentials missing: set credentials.open_api in the config".into(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KwGoldError::Oracle(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            credentials,
            retry: config.retry,
        })
    }

    async fn fetch_total(&self, keyword: &str) -> Result<u64> {
        let response = self
            .client
            .get(BLOG_SEARCH_URL)
            .query(&[("query", keyword), ("display", "1"), ("start", "1")])
            .header("X-Naver-Client-Id", &self.credentials.client_id)
            .header("X-Naver-Client-Secret", &self.credentials.client_secret)
            .send()
            .await
            .map_err(|e| KwGoldError::Oracle(format!("blog search request failed: {e}")))?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(KwGoldError::Oracle("blog search rate limited".into()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| KwGoldError::Oracle(format!("blog search rejected: {e}")))?;
        let body: BlogSearchResponse = response
            .json()
            .await
            .map_err(|e| KwGoldError::Oracle(format!("blog search body unreadable: {e}")))?;
        Ok(body.total)
    }
}

#[async_trait]
impl DocumentCountSource for OpenApiClient {
    async fn document_count(&self, keyword: &Keyword) -> Result<u64> {
        match self
            .retry
            .run("blog count lookup", || self.fetch_total(keyword.as_str()))
            .await
        {
            Ok(total) => Ok(total),
            Err(e) => {
                warn!("document count for '{keyword}' unavailable: {e}");
                Ok(0)
            }
        }
    }
}
