//! HTTP Executor: sends one prepared probe, respecting retries, timeout, delay,
//! and a cache-buster for header-surface probes.
//!
//! Grounded on the teacher's `bust_url_with_retry` (status-driven retry/backoff
//! loop, `tokio::time::Instant` latency measurement), generalized from "GET a
//! fixed path" to "send whatever `reqwest::RequestBuilder` the caller prepared".

use std::time::Duration;

use rand::Rng;
use reqwest::Url;
use tokio::time::{sleep, Instant};

/// A captured probe response: status, headers, body, and timing, mirroring the
/// teacher's `DetailedResponse` but generalized beyond directory-busting.
#[derive(Debug, Clone)]
pub struct ExecutedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: String,
    pub elapsed: Duration,
}

impl ExecutedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The full raw response text (headers followed by body), used by the
    /// analyzer's header/cookie reflection check since servers often echo an
    /// injected header or cookie name only in the response headers (spec §4.2).
    pub fn raw_with_headers(&self) -> String {
        let mut out = String::new();
        for (k, v) in &self.headers {
            out.push_str(k);
            out.push_str(": ");
            out.push_str(v);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out
    }
}

/// Tuning knobs the executor needs on every call.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub retry: usize,
    pub timeout: Duration,
    pub delay: Duration,
    pub follow_redirects: bool,
}

/// Sends one prepared request, making up to `config.retry` attempts total on
/// transport failure. `build` constructs a fresh `RequestBuilder` for each
/// attempt (probe bodies here are always owned bytes, so rebuilding is cheap
/// and avoids the streaming-body edge case in `RequestBuilder::try_clone`).
/// Returns `None` only once every attempt has failed — the spec's "null
/// result" (§4.1).
pub async fn send<F>(config: &ExecutorConfig, build: F) -> Option<ExecutedResponse>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    for attempt in 0..config.retry {
        let start = Instant::now();
        let request = build().timeout(config.timeout);
        match request.send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let content_type = resp
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                let content_length = resp.content_length();
                let headers = resp
                    .headers()
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
                    .collect();
                let body = resp.text().await.unwrap_or_default();
                return Some(ExecutedResponse {
                    status,
                    headers,
                    content_type,
                    content_length,
                    body,
                    elapsed: start.elapsed(),
                });
            }
            Err(_) if attempt + 1 < config.retry => {
                sleep(config.delay).await;
                continue;
            }
            Err(_) => return None,
        }
    }
    None
}

/// Appends a random `key=value` pair to `url`'s query string, to defeat
/// intermediate caches for header-surface probes (spec §4.1).
pub fn apply_cache_buster(url: &mut Url) {
    let mut rng = rand::rng();
    let key: String = format!("_cb{}", rng.random_range(10_000..99_999));
    let value: String = rng.random_range(100_000..999_999).to_string();
    url.query_pairs_mut().append_pair(&key, &value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_buster_appends_unique_param() {
        let mut url = Url::parse("https://example.com/probe?x=1").unwrap();
        let before = url.query().unwrap().to_string();
        apply_cache_buster(&mut url);
        let after = url.query().unwrap().to_string();
        assert!(after.starts_with(&before));
        assert!(after.len() > before.len());
    }
}
