//! URL-Finder: appends `name=canary` pairs to the target's query string.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::executor::{self, ExecutedResponse, ExecutorConfig};
use crate::finders::{finish_probe, greedy_byte_chunks, padding_value, Finder};
use crate::request::RequestInfo;
use crate::surface::{SurfaceTag, Verdict};

pub struct UrlFinder;

fn build_url_with_pairs(base: &Url, pairs: &[(String, String)]) -> Url {
    let mut url = base.clone();
    {
        let mut qp = url.query_pairs_mut();
        for (k, v) in pairs {
            qp.append_pair(k, v);
        }
    }
    url
}

#[async_trait]
impl Finder for UrlFinder {
    fn surface(&self) -> SurfaceTag {
        SurfaceTag::Url
    }

    fn is_searchable(&self, _request: &RequestInfo, wordlist: &[String]) -> bool {
        !wordlist.is_empty()
    }

    fn pre_existing_size(&self, request: &RequestInfo) -> usize {
        request.url.query().map(|q| q.len()).unwrap_or(0)
    }

    fn min_chunk_size(&self, max_name_len: usize, max_canary_len: usize) -> usize {
        1 + max_name_len + 1 + max_canary_len
    }

    fn word_chunks(&self, names: &[String], bucket_size: usize, max_canary_len: usize) -> Vec<Vec<String>> {
        // "&name=canary": 1 (&) + name + 1 (=) + canary.
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
            .get(&SurfaceTag::Url)
            .expect("canary must be prepared before probing");
        let pairs: Vec<(String, String)> = names.iter().map(|n| (n.clone(), canary.value.clone())).collect();
        let url = build_url_with_pairs(&request.url, &pairs);

        let response = executor::send(exec_cfg, || {
            let mut b = client.request(request.method.clone(), url.clone());
            for (k, v) in &request.headers {
                b = b.header(k, v);
            }
            if let Some(body) = &request.body {
                b = b.body(body.clone());
            }
            b
        })
        .await;

        finish_probe(request, names, response, canary, SurfaceTag::Url)
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
        let url = build_url_with_pairs(&request.url, &[(filler_name.to_string(), padding_value(value_len))]);
        executor::send(exec_cfg, || {
            let mut b = client.request(request.method.clone(), url.clone());
            for (k, v) in &request.headers {
                b = b.header(k, v);
            }
            if let Some(body) = &request.body {
                b = b.body(body.clone());
            }
            b
        })
        .await
    }
}
