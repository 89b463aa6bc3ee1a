//! Body-JSON-Finder: inserts new top-level keys into a JSON object body.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};

use crate::executor::{self, ExecutedResponse, ExecutorConfig};
use crate::finders::{finish_probe, padding_value, Finder};
use crate::request::RequestInfo;
use crate::surface::{SurfaceTag, Verdict};

pub struct BodyJsonFinder;

/// Per-name overhead of inserting `, "k": "v"` into a JSON object (spec §4.3):
/// `,`, two pairs of quotes, `:`, and a space — 12 fixed bytes total.
const JSON_PER_NAME_OVERHEAD: usize = 12;

fn parse_object(request: &RequestInfo) -> Option<Map<String, Value>> {
    let body = request.body.as_deref()?;
    match serde_json::from_slice::<Value>(body).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn build_body(mut map: Map<String, Value>, pairs: &[(String, String)]) -> String {
    for (k, v) in pairs {
        map.insert(k.clone(), Value::String(v.clone()));
    }
    Value::Object(map).to_string()
}

#[async_trait]
impl Finder for BodyJsonFinder {
    fn surface(&self) -> SurfaceTag {
        SurfaceTag::BodyJson
    }

    fn is_searchable(&self, request: &RequestInfo, wordlist: &[String]) -> bool {
        !wordlist.is_empty() && parse_object(request).is_some()
    }

    fn pre_existing_size(&self, request: &RequestInfo) -> usize {
        request.body.as_ref().map(|b| b.len()).unwrap_or(0)
    }

    fn min_chunk_size(&self, max_name_len: usize, max_canary_len: usize) -> usize {
        JSON_PER_NAME_OVERHEAD + max_name_len + max_canary_len
    }

    fn word_chunks(&self, names: &[String], bucket_size: usize, max_canary_len: usize) -> Vec<Vec<String>> {
        let mut chunks = Vec::new();
        let mut current = Vec::new();
        let mut current_size = 0usize;
        for name in names {
            let cost = JSON_PER_NAME_OVERHEAD + name.len() + max_canary_len;
            if !current.is_empty() && current_size + cost > bucket_size {
                chunks.push(std::mem::take(&mut current));
                current_size = 0;
            }
            current.push(name.clone());
            current_size += cost;
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
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
            .get(&SurfaceTag::BodyJson)
            .expect("canary must be prepared before probing");
        let Some(map) = parse_object(request) else {
            return Verdict::Discard;
        };
        let pairs: Vec<(String, String)> = names.iter().map(|n| (n.clone(), canary.value.clone())).collect();
        let body = build_body(map, &pairs);

        let response = executor::send(exec_cfg, || {
            let mut b = client
                .request(request.method.clone(), request.url.clone())
                .header(reqwest::header::CONTENT_TYPE, "application/json");
            for (k, v) in &request.headers {
                if !k.eq_ignore_ascii_case("content-type") {
                    b = b.header(k, v);
                }
            }
            b.body(body.clone())
        })
        .await;

        finish_probe(request, names, response, canary, SurfaceTag::BodyJson)
    }

    async fn probe_payload_size(
        &self,
        request: &RequestInfo,
        payload_size: usize,
        client: &Client,
        exec_cfg: &ExecutorConfig,
    ) -> Option<ExecutedResponse> {
        let Some(map) = parse_object(request) else {
            return None;
        };
        let value_len = payload_size.saturating_sub(JSON_PER_NAME_OVERHEAD + "__bucket_probe".len());
        let body = build_body(map, &[("__bucket_probe".to_string(), padding_value(value_len))]);
        executor::send(exec_cfg, || {
            let mut b = client
                .request(request.method.clone(), request.url.clone())
                .header(reqwest::header::CONTENT_TYPE, "application/json");
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
    use crate::canary::Canary;
    use url::Url;

    fn json_request(body: &str) -> RequestInfo {
        let mut info = RequestInfo::new(
            reqwest::Method::POST,
            Url::parse("https://example.com/api").unwrap(),
            vec![],
            Some(body.as_bytes().to_vec()),
        );
        info.canaries.insert(SurfaceTag::BodyJson, Canary::generate());
        info
    }

    #[test]
    fn object_body_is_searchable() {
        let finder = BodyJsonFinder;
        let req = json_request(r#"{"a":1}"#);
        assert!(finder.is_searchable(&req, &["admin".to_string()]));
    }

    #[test]
    fn array_body_is_not_searchable() {
        let finder = BodyJsonFinder;
        let req = json_request(r#"[1,2,3]"#);
        assert!(!finder.is_searchable(&req, &["admin".to_string()]));
    }
}
