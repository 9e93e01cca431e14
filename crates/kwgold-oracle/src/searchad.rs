use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use kwgold_core::{
    Keyword, KwGoldError, OracleConfig, RawVolume, Result, RetryPolicy, SearchAdCredentials,
    SearchVolume, SearchVolumeSource, VOLUME_BATCH_LIMIT,
};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;

const API_BASE: &str = "https://api.searchad.naver.com";
const KEYWORD_TOOL_PATH: &str = "/keywordstool";

type HmacSha256 = Hmac<Sha256>;

/// Search-volume oracle backed by the search-ad keyword tool.
///
/// Requests carry an HMAC-SHA256 signature over
/// `{timestamp}.{method}.{path}` (the path without its query string).
/// Keywords are sent whitespace-stripped and the provider reports them
/// back in that form.
pub struct SearchAdClient {
    client: Client,
    credentials: SearchAdCredentials,
    retry: RetryPolicy,
}

impl SearchAdClient {
    pub fn new(config: &OracleConfig, credentials: SearchAdCredentials) -> Result<Self> {
        if credentials.api_key.is_empty() || credentials.secret_key.is_empty() {
            return Err(KwGoldError::Config(
                "search-ad credentials missing: set credentials.search_ad in the config".into(),
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

    async fn fetch(&self, hint_keywords: &str) -> Result<String> {
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let signature = sign(
            &self.credentials.secret_key,
            &timestamp,
            "GET",
            KEYWORD_TOOL_PATH,
        )?;
        let response = self
            .client
            .get(format!("{API_BASE}{KEYWORD_TOOL_PATH}"))
            .query(&[("hintKeywords", hint_keywords), ("showDetail", "1")])
            .header("X-Timestamp", &timestamp)
            .header("X-API-KEY", &self.credentials.api_key)
            .header("X-Customer", &self.credentials.customer_id)
            .header("X-Signature", &signature)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| KwGoldError::Oracle(format!("keyword tool request failed: {e}")))?
            .error_for_status()
            .map_err(|e| KwGoldError::Oracle(format!("keyword tool rejected: {e}")))?;
        response
            .text()
            .await
            .map_err(|e| KwGoldError::Oracle(format!("keyword tool body unreadable: {e}")))
    }
}

#[async_trait]
impl SearchVolumeSource for SearchAdClient {
    async fn search_volumes(&self, keywords: &[Keyword]) -> Result<HashMap<String, SearchVolume>> {
        if keywords.is_empty() {
            return Ok(HashMap::new());
        }
        if keywords.len() > VOLUME_BATCH_LIMIT {
            return Err(KwGoldError::Oracle(format!(
                "volume lookups are limited to {VOLUME_BATCH_LIMIT} keywords, got {}",
                keywords.len()
            )));
        }
        let hint: String = keywords
            .iter()
            .map(|k| k.cleaned())
            .collect::<Vec<_>>()
            .join(",");
        let body = self
            .retry
            .run("keyword tool lookup", || self.fetch(&hint))
            .await?;
        parse_volume_response(&body)
    }
}

/// Base64 HMAC-SHA256 request signature.
fn sign(secret_key: &str, timestamp: &str, method: &str, path: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| KwGoldError::Oracle(format!("invalid secret key: {e}")))?;
    mac.update(format!("{timestamp}.{method}.{path}").as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Deserialize)]
struct KeywordToolItem {
    #[serde(default, rename = "relKeyword")]
    rel_keyword: String,
    #[serde(default, rename = "monthlyPcQcCnt")]
    monthly_pc_qc_cnt: RawVolume,
    #[serde(default, rename = "monthlyMobileQcCnt")]
    monthly_mobile_qc_cnt: RawVolume,
}

/// The endpoint answers either with a bare item list or with the list
/// wrapped under `keywordList`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeywordToolBody {
    List(Vec<KeywordToolItem>),
    Wrapped {
        #[serde(rename = "keywordList")]
        keyword_list: Vec<KeywordToolItem>,
    },
}

pub(crate) fn parse_volume_response(body: &str) -> Result<HashMap<String, SearchVolume>> {
    let parsed: KeywordToolBody = serde_json::from_str(body)?;
    let items = match parsed {
        KeywordToolBody::List(items) => items,
        KeywordToolBody::Wrapped { keyword_list } => keyword_list,
    };
    let mut volumes = HashMap::new();
    for item in items {
        if item.rel_keyword.is_empty() {
            continue;
        }
        volumes.insert(
            item.rel_keyword,
            SearchVolume {
                pc: item.monthly_pc_qc_cnt,
                mobile: item.monthly_mobile_qc_cnt,
            },
        );
    }
    Ok(volumes)
}
