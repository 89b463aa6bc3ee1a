//! Target-request preparation: builds `RequestInfo` values from a `-u` URL or a
//! `-r` raw HTTP request / Burp XML export, and captures each one's baseline
//! response before any probing begins.
//!
//! Grounded on the teacher's `parser.rs` line-oriented parsing style, generalized
//! from wordlist/user-agent files to full HTTP request text, and enriched with
//! `url::Url` (see `other_examples/f9ca4edb_martian58-rustfuzz__src-main.rs.rs`,
//! which leans on the same crate for target-URL manipulation) and `base64` for
//! Burp's `base64="true"` request blobs (grounded in `cbaugus-rust_loadtest`'s
//! dependency of the same name).

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Method;
use url::Url;

use crate::canary::Canary;
use crate::error::ParamHuntError;
use crate::surface::SurfaceTag;

static HTML_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?\w+[^>]*>").unwrap());
static REQUEST_ITEM_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<request\s+base64="(true|false)"\s*>(.*?)</request>"#).unwrap());

/// The verbatim response obtained by sending a target request unchanged, before
/// any probing. Captured once per `RequestInfo`.
#[derive(Debug, Clone)]
pub struct BaselineResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: String,
}

impl BaselineResponse {
    pub fn is_html(&self) -> bool {
        let by_header = self
            .content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("html"))
            .unwrap_or(false);
        let by_sniff = {
            let trimmed = self.body.trim_start();
            let lower: String = trimmed.chars().take(32).collect::<String>().to_ascii_lowercase();
            lower.starts_with("<!doctype") || lower.starts_with("<html")
        };
        by_header || by_sniff
    }

    pub fn html_tag_count(&self) -> usize {
        HTML_TAG_REGEX.find_iter(&self.body).count()
    }

    /// The full raw response text (headers followed by body), used by the
    /// analyzer's header/cookie reflection check (spec §4.2).
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

/// One target request, with its per-surface canaries and (once sized) bucket
/// budgets. One `RequestInfo` is created per `-u`/raw-request input.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub origin_url: String,
    pub netloc: String,
    pub baseline_response: Option<BaselineResponse>,
    pub baseline_html_tag_count: usize,
    pub canaries: HashMap<SurfaceTag, Canary>,
    pub bucket_sizes: HashMap<SurfaceTag, Option<usize>>,
    pub additional_names: HashMap<SurfaceTag, Vec<String>>,
}

impl RequestInfo {
    pub fn new(method: Method, url: Url, headers: Vec<(String, String)>, body: Option<Vec<u8>>) -> Self {
        let netloc = match url.port() {
            Some(p) => format!("{}:{}", url.host_str().unwrap_or(""), p),
            None => url.host_str().unwrap_or("").to_string(),
        };
        Self {
            origin_url: url.to_string(),
            netloc,
            method,
            url,
            headers,
            body,
            baseline_response: None,
            baseline_html_tag_count: 0,
            canaries: HashMap::new(),
            bucket_sizes: HashMap::new(),
            additional_names: HashMap::new(),
        }
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline_response.is_some()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn additional_for(&self, surface: SurfaceTag) -> &[String] {
        self.additional_names
            .get(&surface)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Raw pieces extracted from an HTTP/1.1 request-text blob, before the authority
/// (scheme + host) has been resolved.
struct RawRequestParts {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    host: String,
}

fn parse_raw_request_text(text: &str) -> Result<RawRequestParts, ParamHuntError> {
    let normalized = text.replace("\r\n", "\n");
    let mut parts = normalized.splitn(2, "\n\n");
    let head = parts.next().unwrap_or_default();
    let body = parts.next().unwrap_or("").as_bytes().to_vec();

    let mut lines = head.lines();
    let request_line = lines.next().ok_or_else(|| ParamHuntError::RawRequestParse {
        path: "<raw>".into(),
        reason: "empty request".to_string(),
    })?;

    let mut rl_parts = request_line.split_whitespace();
    let method = rl_parts
        .next()
        .ok_or_else(|| ParamHuntError::RawRequestParse {
            path: "<raw>".into(),
            reason: "missing method".to_string(),
        })?
        .to_string();
    let path = rl_parts
        .next()
        .ok_or_else(|| ParamHuntError::RawRequestParse {
            path: "<raw>".into(),
            reason: "missing path".to_string(),
        })?
        .to_string();

    let mut headers = Vec::new();
    let mut host = String::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if let Some((k, v)) = line.split_once(':') {
            let key = k.trim().to_string();
            let value = v.trim().to_string();
            if key.eq_ignore_ascii_case("host") {
                host = value.clone();
            }
            headers.push((key, value));
        }
    }

    if host.is_empty() {
        return Err(ParamHuntError::RawRequestParse {
            path: "<raw>".into(),
            reason: "missing Host header".to_string(),
        });
    }

    Ok(RawRequestParts {
        method,
        path,
        headers,
        body,
        host,
    })
}

/// Re-serializes parsed parts back to raw HTTP/1.1 text, used by the round-trip
/// property test (spec §8 invariant 5).
fn serialize_raw_request(parts: &RawRequestParts) -> String {
    let mut out = format!("{} {} HTTP/1.1\r\n", parts.method, parts.path);
    for (k, v) in &parts.headers {
        out.push_str(&format!("{k}: {v}\r\n"));
    }
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(&parts.body));
    out
}

/// Issues an HTTPS HEAD request against `authority`; falls back to HTTP on any
/// transport/TLS failure, per spec §6's scheme-autodetection rule.
pub async fn detect_scheme(client: &reqwest::Client, authority: &str) -> &'static str {
    let probe = format!("https://{authority}/");
    match client
        .head(&probe)
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        Ok(_) => "https",
        Err(_) => "http",
    }
}

/// Builds a `RequestInfo` from one raw HTTP request file's text, resolving scheme
/// via `detect_scheme` against the request's `Host` header.
pub async fn request_info_from_raw(
    client: &reqwest::Client,
    text: &str,
) -> Result<RequestInfo, ParamHuntError> {
    let parts = parse_raw_request_text(text)?;
    let scheme = detect_scheme(client, &parts.host).await;
    let full = format!("{scheme}://{}{}", parts.host, parts.path);
    let url = Url::parse(&full).map_err(|e| ParamHuntError::RawRequestParse {
        path: "<raw>".into(),
        reason: e.to_string(),
    })?;
    let method = Method::from_bytes(parts.method.as_bytes()).map_err(|_| ParamHuntError::RawRequestParse {
        path: "<raw>".into(),
        reason: format!("invalid method {}", parts.method),
    })?;
    let body = if parts.body.is_empty() { None } else { Some(parts.body) };
    Ok(RequestInfo::new(method, url, parts.headers, body))
}

/// Parses a Burp Suite XML export (`<items><item><request base64="...">…`) into
/// one `RequestInfo` per `<item>`, decoding base64-wrapped requests first.
pub async fn request_infos_from_burp_xml(
    client: &reqwest::Client,
    xml: &str,
) -> Result<Vec<RequestInfo>, ParamHuntError> {
    let mut out = Vec::new();
    for caps in REQUEST_ITEM_REGEX.captures_iter(xml) {
        let is_base64 = &caps[1] == "true";
        let raw_text = caps[2].trim();
        let decoded = if is_base64 {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(raw_text.as_bytes())
                .map_err(|e| ParamHuntError::RawRequestParse {
                    path: "<burp-xml>".into(),
                    reason: e.to_string(),
                })?;
            String::from_utf8_lossy(&bytes).to_string()
        } else {
            raw_text.to_string()
        };
        out.push(request_info_from_raw(client, &decoded).await?);
    }
    Ok(out)
}

/// Builds a `RequestInfo` directly from a CLI-supplied URL, method, body, and
/// headers (the `-u`/`-m`/`-d`/`-H` flags), with no scheme detection needed.
pub fn request_info_from_url(
    url_str: &str,
    method: &str,
    body: Option<String>,
    headers: Vec<(String, String)>,
) -> Result<RequestInfo, ParamHuntError> {
    let url = Url::parse(url_str).map_err(|e| ParamHuntError::RawRequestParse {
        path: url_str.into(),
        reason: e.to_string(),
    })?;
    let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParamHuntError::RawRequestParse {
        path: url_str.into(),
        reason: format!("invalid method {method}"),
    })?;
    Ok(RequestInfo::new(
        method,
        url,
        headers,
        body.map(|b| b.into_bytes()),
    ))
}

/// Sends the target request unchanged and captures its baseline response.
/// Returns `None` on transport failure — the caller drops such requests before
/// probing begins (spec §7 "Baseline fetch failure").
pub async fn fetch_baseline(client: &reqwest::Client, info: &RequestInfo) -> Option<BaselineResponse> {
    let mut builder = client.request(info.method.clone(), info.url.clone());
    for (k, v) in &info.headers {
        builder = builder.header(k, v);
    }
    if let Some(body) = &info.body {
        builder = builder.body(body.clone());
    }
    let resp = builder.send().await.ok()?;
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
    let body = resp.text().await.ok()?;
    Some(BaselineResponse {
        status,
        headers,
        content_type,
        content_length,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "GET /echo?x=1 HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n";

    #[test]
    fn raw_request_round_trips() {
        let parts = parse_raw_request_text(SAMPLE).unwrap();
        assert_eq!(parts.method, "GET");
        assert_eq!(parts.path, "/echo?x=1");
        assert_eq!(parts.host, "example.com");

        let serialized = serialize_raw_request(&parts);
        let reparsed = parse_raw_request_text(&serialized).unwrap();
        assert_eq!(reparsed.method, parts.method);
        assert_eq!(reparsed.path, parts.path);
        assert_eq!(reparsed.host, parts.host);
        assert_eq!(reparsed.body, parts.body);
    }

    #[test]
    fn missing_host_header_is_rejected() {
        let bad = "GET / HTTP/1.1\r\nAccept: */*\r\n\r\n";
        assert!(parse_raw_request_text(bad).is_err());
    }

    #[test]
    fn post_body_is_preserved() {
        let raw = "POST /api HTTP/1.1\r\nHost: example.com\r\nContent-Type: application/json\r\n\r\n{\"a\":1}";
        let parts = parse_raw_request_text(raw).unwrap();
        assert_eq!(parts.body, b"{\"a\":1}");
    }
}
