use crate::error::{PricingError, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Transport port so the pipeline and tests can substitute the HTTP layer.
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> std::result::Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub body: String,
}

/// Default reqwest-backed adapter.
pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl Default for ReqwestHttp {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestHttp {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HttpClientPort for ReqwestHttp {
    async fn get(&self, url: &str) -> std::result::Result<HttpGetResult, String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| e.to_string())?;
        Ok(HttpGetResult { status, body })
    }
}

/// Retrieves one pricing document: bounded transport retry, then framing
/// strip and parse with a one-shot repair for unquoted keys. Transport
/// failures and parse failures are separate error kinds; a document that
/// fails to parse is never re-fetched.
pub struct DocumentFetcher {
    http: Arc<dyn HttpClientPort>,
    retry_limit: u32,
    backoff: Duration,
}

impl DocumentFetcher {
    pub fn new(http: Arc<dyn HttpClientPort>, retry_limit: u32, backoff_secs: u64) -> Self {
        Self {
            http,
            retry_limit,
            backoff: Duration::from_secs(backoff_secs),
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<Value> {
        let body = self.fetch_body(url).await?;
        parse_document(url, &body)
    }

    async fn fetch_body(&self, url: &str) -> Result<String> {
        let mut last_error = String::new();
        for attempt in 1..=self.retry_limit {
            match self.http.get(url).await {
                Ok(result) if (200..300).contains(&result.status) => {
                    debug!(url, attempt, "fetched pricing document");
                    return Ok(result.body);
                }
                Ok(result) => last_error = format!("HTTP status {}", result.status),
                Err(e) => last_error = e,
            }
            warn!(url, attempt, error = %last_error, "fetch attempt failed");
            if attempt < self.retry_limit {
                tokio::time::sleep(self.backoff).await;
            }
        }
        Err(PricingError::FetchFailed {
            url: url.to_string(),
            attempts: self.retry_limit,
            reason: last_error,
        })
    }
}

/// Strip the JSONP framing the pricing endpoints switched to: a
/// `callback(...)` wrapper and a trailing statement terminator, which some
/// documents put on a line of its own and others append to the last line.
pub fn strip_callback_framing(body: &str) -> String {
    let mut s = body.trim().to_string();
    if let Some(rest) = s.strip_prefix("callback(") {
        let mut inner = rest.to_string();
        if let Some(idx) = inner.rfind(')') {
            inner.remove(idx);
        }
        s = inner;
    }
    let terminator_line = s.lines().last().map(|l| l.trim() == ";").unwrap_or(false);
    if terminator_line {
        if let Some(idx) = s.rfind(';') {
            s.truncate(idx);
        }
    } else if s.trim_end().ends_with(';') {
        if let Some(idx) = s.rfind(';') {
            s.remove(idx);
        }
    }
    s
}

// Matches a bare word key directly before a colon, e.g. {foo: "1"}.
static BARE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([{,\[\s]|^)([A-Za-z_]\w*)\s*:"#).unwrap());

/// Corrective rewrite for the known malformed-producer variant that emits
/// object keys without quotes.
pub fn quote_bare_keys(body: &str) -> String {
    BARE_KEY.replace_all(body, "$1\"$2\":").to_string()
}

/// Parse a fetched body, repairing unquoted keys if the first parse fails.
pub fn parse_document(url: &str, body: &str) -> Result<Value> {
    let stripped = strip_callback_framing(body);
    match serde_json::from_str(&stripped) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            debug!(url, error = %first_err, "parse failed, retrying with bare-key repair");
            let repaired = quote_bare_keys(&stripped);
            serde_json::from_str(&repaired).map_err(|_| PricingError::MalformedDocument {
                url: url.to_string(),
                reason: first_err.to_string(),
            })
        }
    }
}
