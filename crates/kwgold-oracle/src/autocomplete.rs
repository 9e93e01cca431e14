use async_trait::async_trait;
use kwgold_core::{Keyword, KwGoldError, OracleConfig, RelatedKeywordSource, Result, RetryPolicy};
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;

const AUTOCOMPLETE_URL: &str = "https://mac.search.naver.com/mobile/ac";
const JSONP_CALLBACK: &str = "jsonp12345";
const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; Pixel 3) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/111.0 Mobile Safari/537.36";
const REFERER: &str = "https://m.search.naver.com/";

/// Related-keywords oracle backed by the mobile autocomplete endpoint.
///
/// The endpoint answers either in JSONP or plain JSON; both are handled.
/// Exhausted retries and malformed bodies degrade to an empty suggestion
/// list.
pub struct AutocompleteClient {
    client: Client,
    retry: RetryPolicy,
}

impl AutocompleteClient {
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KwGoldError::Oracle(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            retry: config.retry,
        })
    }

    async fn fetch(&self, keyword: &str) -> Result<String> {
        let response = self
            .client
            .get(AUTOCOMPLETE_URL)
            .query(&[
                ("q", keyword),
                ("st", "1"),
                ("frm", "mobile_nv"),
                ("r_format", "json"),
                ("r_enc", "UTF-8"),
                ("r_unicode", "0"),
                ("r_lt", "koreng"),
                ("enc", "UTF-8"),
                ("ans", "1"),
                ("run", "2"),
                ("rev", "4"),
                ("callback", JSONP_CALLBACK),
            ])
            .header(reqwest::header::USER_AGENT, MOBILE_USER_AGENT)
            .header(reqwest::header::REFERER, REFERER)
            .send()
            .await
            .map_err(|e| KwGoldError::Oracle(format!("autocomplete request failed: {e}")))?
            .error_for_status()
            .map_err(|e| KwGoldError::Oracle(format!("autocomplete rejected: {e}")))?;
        response
            .text()
            .await
            .map_err(|e| KwGoldError::Oracle(format!("autocomplete body unreadable: {e}")))
    }
}

#[async_trait]
impl RelatedKeywordSource for AutocompleteClient {
    async fn related(&self, keyword: &Keyword) -> Result<Vec<Keyword>> {
        let body = self
            .retry
            .run("autocomplete lookup", || self.fetch(keyword.as_str()))
            .await;
        match body {
            Ok(body) => match parse_suggestions(&body, keyword.as_str()) {
                Ok(suggestions) => Ok(suggestions),
                Err(e) => {
                    warn!("autocomplete body for '{keyword}' unparseable: {e}");
                    Ok(Vec::new())
                }
            },
            Err(e) => {
                warn!("autocomplete lookup for '{keyword}' gave up: {e}");
                Ok(Vec::new())
            }
        }
    }
}

/// Peel the JSONP wrapper if present; plain JSON passes through.
fn strip_jsonp(body: &str) -> &str {
    let trimmed = body.trim();
    match trimmed
        .strip_prefix(JSONP_CALLBACK)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.trim_end().strip_suffix(';'))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => inner,
        None => trimmed,
    }
}

/// Pull suggestion strings out of the nested `items` arrays. Each item
/// group is a list of `[suggestion, ...]` entries; the query keyword
/// itself and duplicates within one response are dropped.
pub(crate) fn parse_suggestions(body: &str, keyword: &str) -> Result<Vec<Keyword>> {
    let value: serde_json::Value = serde_json::from_str(strip_jsonp(body))?;
    let mut suggestions = Vec::new();
    let mut seen = HashSet::new();
    let Some(items) = value.get("items").and_then(|v| v.as_array()) else {
        return Ok(suggestions);
    };
    for group in items {
        let Some(group) = group.as_array() else {
            continue;
        };
        for entry in group {
            let Some(entry) = entry.as_array() else {
                continue;
            };
            let Some(text) = entry.first().and_then(|v| v.as_str()) else {
                continue;
            };
            let suggestion = Keyword::new(text);
            if suggestion.is_empty() || suggestion.as_str() == keyword {
                continue;
            }
            if seen.insert(suggestion.clone()) {
                suggestions.push(suggestion);
            }
        }
    }
    Ok(suggestions)
}
