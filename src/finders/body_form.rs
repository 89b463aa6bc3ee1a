//! Body-Form-Finder: appends `key=value` pairs to an `application/x-www-form-urlencoded` body.

use async_trait::async_trait;
use reqwest::{Client, Method};
use url::form_urlencoded;

use crate::executor::{self, ExecutedResponse, ExecutorConfig};
use crate::finders::{finish_probe, greedy_byte_chunks, padding_value, Finder};
use crate::request::RequestInfo;
use crate::surface::{SurfaceTag, Verdict};

pub struct BodyFormFinder;

const REJECTED_METHODS: [Method; 5] = [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE, Method::CONNECT];

fn existing_body_str(request: &RequestInfo) -> &str {
    request
        .body
        .as_deref()
        .and_then(|b| std::str::from_utf8(b).ok())
        .unwrap_or("")
}

fn looks_form_encoded(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed.is_empty() || (!trimmed.starts_with('{') && !trimmed.starts_with('['))
}

fn build_body(existing: &str, pairs: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in form_urlencoded::parse(existing.as_bytes()) {
        serializer.append_pair(&k, &v);
    }
    for (k, v) in pairs {
        serializer.append_pair(k, v);
    }
    serializer.finish()
}

#[async_trait]
impl Finder for BodyFormFinder {
    fn surface(&self) -> SurfaceTag {
        SurfaceTag::BodyForm
    }

    fn is_searchable(&self, request: &RequestInfo, wordlist: &[String]) -> bool {
        if wordlist.is_empty() {
            return false;
        }
        if REJECTED_METHODS.contains(&request.method) {
            return false;
        }
        looks_form_encoded(existing_body_str(request))
    }

    fn pre_existing_size(&self, request: &RequestInfo) -> usize {
        request.body.as_ref().map(|b| b.len()).unwrap_or(0)
    }

    fn min_chunk_size(&self, max_name_len: usize, max_canary_len: usize) -> usize {
        1 + max_name_len + 1 + max_canary_len
    }

    fn word_chunks(&self, names: &[String], bucket_size: usize, max_canary_len: usize) -> Vec<Vec<String>> {
        greedy_byte_chunks(names, bucket_size, 2 + max_canary_len)
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
            .get(&SurfaceTag::BodyForm)
            .expect("canary must be prepared before probing");
        let pairs: Vec<(String, String)> = names.iter().map(|n| (n.clone(), canary.value.clone())).collect();
        let body = build_body(existing_body_str(request), &pairs);

        let response = executor::send(exec_cfg, || {
            let mut b = client
                .request(request.method.clone(), request.url.clone())
                .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            for (k, v) in &request.headers {
                if !k.eq_ignore_ascii_case("content-type") {
                    b = b.header(k, v);
                }
            }
            b.body(body.clone())
        })
        .await;

        finish_probe(request, names, response, canary, SurfaceTag::BodyForm)
    }

    async fn probe_payload_size(
        &self,
        request: &RequestInfo,
        payload_size: usize,
        client: &Client,
        exec_cfg: &ExecutorConfig,
    ) -> Option<ExecutedResponse> {
        let filler_name = "__bucket_probe";
        let value_len = payload_size.saturating_sub(filler_name.len() + 1);
        let body = build_body(existing_body_str(request), &[(filler_name.to_string(), padding_value(value_len))]);
        executor::send(exec_cfg, || {
            let mut b = client
                .request(request.method.clone(), request.url.clone())
                .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            for (k, v) in &request.headers {
                if !k.eq_ignore_ascii_case("content-type") {
                    b = b.header(k, v);
                }
            }
            b.body(body.clone())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_body_is_not_form_encoded() {
        assert!(!looks_form_encoded(r#"{"a":1}"#));
    }

    #[test]
    fn empty_or_kv_body_is_form_encoded() {
        assert!(looks_form_encoded(""));
        assert!(looks_form_encoded("a=1&b=2"));
    }
}
