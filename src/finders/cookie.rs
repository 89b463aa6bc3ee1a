//! Cookie-Finder: appends `; name=canary` pairs to the request's `Cookie` header.

use async_trait::async_trait;
use reqwest::Client;

use crate::executor::{self, ExecutedResponse, ExecutorConfig};
use crate::finders::{finish_probe, greedy_byte_chunks, padding_value, Finder};
use crate::request::RequestInfo;
use crate::surface::{SurfaceTag, Verdict};

pub struct CookieFinder;

fn existing_cookie(request: &RequestInfo) -> &str {
    request.header("cookie").unwrap_or("")
}

fn build_cookie_header(existing: &str, pairs: &[(String, String)]) -> String {
    let mut segments: Vec<String> = existing
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    for (k, v) in pairs {
        segments.push(format!("{k}={v}"));
    }
    segments.join("; ")
}

#[async_trait]
impl Finder for CookieFinder {
    fn surface(&self) -> SurfaceTag {
        SurfaceTag::Cookie
    }

    fn is_searchable(&self, _request: &RequestInfo, wordlist: &[String]) -> bool {
        !wordlist.is_empty()
    }

    fn pre_existing_size(&self, request: &RequestInfo) -> usize {
        existing_cookie(request).len()
    }

    fn min_chunk_size(&self, max_name_len: usize, max_canary_len: usize) -> usize {
        2 + max_name_len + 1 + max_canary_len
    }

    fn word_chunks(&self, names: &[String], bucket_size: usize, max_canary_len: usize) -> Vec<Vec<String>> {
        // "; name=canary": 2 ("; ") + name + 1 (=) + canary.
        greedy_byte_chunks(names, bucket_size, 3 + max_canary_len)
    }

    async fn probe(
        &self,
        request: &RequestInfo,
        names: &[String],
        client: &Client,
        exec_cfg: &ExecutorConfig,
    ) -> Verdict {
        let canary = request
            .canaries
            .get(&SurfaceTag::Cookie)
            .expect("canary must be prepared before probing");
        let pairs: Vec<(String, String)> = names.iter().map(|n| (n.clone(), canary.value.clone())).collect();
        let cookie_header = build_cookie_header(existing_cookie(request), &pairs);

        let response = executor::send(exec_cfg, || {
            let mut b = client.request(request.method.clone(), request.url.clone());
            for (k, v) in &request.headers {
                if !k.eq_ignore_ascii_case("cookie") {
                    b = b.header(k, v);
                }
            }
            b = b.header(reqwest::header::COOKIE, &cookie_header);
            if let Some(body) = &request.body {
                b = b.body(body.clone());
            }
            b
        })
        .await;

        finish_probe(request, names, response, canary, SurfaceTag::Cookie)
    }

    async fn probe_payload_size(
        &self,
        request: &RequestInfo,
        payload_size: usize,
        client: &Client,
        exec_cfg: &ExecutorConfig,
    ) -> Option<ExecutedResponse> {
        let filler_name = "__bucket_probe";
        let value_len = payload_size.saturating_sub(filler_name.len() + 3);
        let cookie_header = build_cookie_header(existing_cookie(request), &[(filler_name.to_string(), padding_value(value_len))]);

        executor::send(exec_cfg, || {
            let mut b = client.request(request.method.clone(), request.url.clone());
            for (k, v) in &request.headers {
                if !k.eq_ignore_ascii_case("cookie") {
                    b = b.header(k, v);
                }
            }
            b = b.header(reqwest::header::COOKIE, &cookie_header);
            if let Some(body) = &request.body {
                b = b.body(body.clone());
            }
            b
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_to_empty_cookie_jar() {
        let header = build_cookie_header("", &[("session".to_string(), "abc".to_string())]);
        assert_eq!(header, "session=abc");
    }

    #[test]
    fn appends_after_existing_cookies() {
        let header = build_cookie_header("a=1; b=2", &[("c".to_string(), "3".to_string())]);
        assert_eq!(header, "a=1; b=2; c=3");
    }
}
