//! Header-Finder: adds `Name: canary` request headers, chunked by count rather
//! than bytes, and injects a cache-buster query param on every probe (spec §4.1,
//! §4.3) since intermediaries are far more likely to cache on header variation.

use async_trait::async_trait;
use reqwest::Client;

use crate::executor::{self, apply_cache_buster, ExecutedResponse, ExecutorConfig};
use crate::finders::{finish_probe, padding_value, Finder};
use crate::request::RequestInfo;
use crate::surface::{SurfaceTag, Verdict};

pub struct HeaderFinder;

#[async_trait]
impl Finder for HeaderFinder {
    fn surface(&self) -> SurfaceTag {
        SurfaceTag::Header
    }

    fn is_searchable(&self, _request: &RequestInfo, wordlist: &[String]) -> bool {
        !wordlist.is_empty()
    }

    fn pre_existing_size(&self, request: &RequestInfo) -> usize {
        request.headers.len()
    }

    fn min_chunk_size(&self, _max_name_len: usize, _max_canary_len: usize) -> usize {
        1
    }

    /// Header surface chunking is by header *count*, not bytes.
    fn word_chunks(&self, names: &[String], bucket_size: usize, _max_canary_len: usize) -> Vec<Vec<String>> {
        let bucket_size = bucket_size.max(1);
        names.chunks(bucket_size).map(|c| c.to_vec()).collect()
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
            .get(&SurfaceTag::Header)
            .expect("canary must be prepared before probing");
        let mut url = request.url.clone();
        apply_cache_buster(&mut url);

        let response = executor::send(exec_cfg, || {
            let mut b = client.request(request.method.clone(), url.clone());
            for (k, v) in &request.headers {
                b = b.header(k, v);
            }
            for name in names {
                b = b.header(name, &canary.value);
            }
            if let Some(body) = &request.body {
                b = b.body(body.clone());
            }
            b
        })
        .await;

        finish_probe(request, names, response, canary, SurfaceTag::Header)
    }

    async fn probe_payload_size(
        &self,
        request: &RequestInfo,
        payload_size: usize,
        client: &Client,
        exec_cfg: &ExecutorConfig,
    ) -> Option<ExecutedResponse> {
        let mut url = request.url.clone();
        apply_cache_buster(&mut url);
        let filler_headers: Vec<String> = (0..payload_size).map(|i| format!("X-Bucket-Probe-{i}")).collect();
        let filler_value = padding_value(8);

        executor::send(exec_cfg, || {
            let mut b = client.request(request.method.clone(), url.clone());
            for (k, v) in &request.headers {
                b = b.header(k, v);
            }
            for name in &filler_headers {
                b = b.header(name, &filler_value);
            }
            if let Some(body) = &request.body {
                b = b.body(body.clone());
            }
            b
        })
        .await
    }
}
