//! Finder Orchestrator: ties bucket-sizing, chunk generation, and the
//! scheduler together (spec §4.6).
//!
//! Grounded on the teacher's `main.rs` top-level orchestration (build
//! config/client, run a phase, summarize), generalized to many
//! (request, surface) pairs across five finders.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use url::form_urlencoded;

use crate::bucket::{self, BucketCache};
use crate::canary::Canary;
use crate::config::Config;
use crate::error::SurfaceError;
use crate::executor::ExecutorConfig;
use crate::finders::body_form::BodyFormFinder;
use crate::finders::body_json::BodyJsonFinder;
use crate::finders::cookie::CookieFinder;
use crate::finders::header::HeaderFinder;
use crate::finders::url::UrlFinder;
use crate::finders::Finder;
use crate::logger::Logger;
use crate::request::RequestInfo;
use crate::results::ResultTree;
use crate::scheduler;
use crate::surface::{SurfaceTag, WorkItem};
use crate::wordlist::Wordlists;

fn build_finders() -> HashMap<SurfaceTag, Box<dyn Finder + Send + Sync>> {
    let mut finders: HashMap<SurfaceTag, Box<dyn Finder + Send + Sync>> = HashMap::new();
    finders.insert(SurfaceTag::Url, Box::new(UrlFinder));
    finders.insert(SurfaceTag::BodyForm, Box::new(BodyFormFinder));
    finders.insert(SurfaceTag::BodyJson, Box::new(BodyJsonFinder));
    finders.insert(SurfaceTag::Header, Box::new(HeaderFinder));
    finders.insert(SurfaceTag::Cookie, Box::new(CookieFinder));
    finders
}

/// Names already occupying `surface` in the original request, so a finder
/// never re-proposes a name the target already accepts unprobed (spec §4.3
/// "subtracts names already present").
fn existing_names(request: &RequestInfo, surface: SurfaceTag) -> HashSet<String> {
    match surface {
        SurfaceTag::Url => request.url.query_pairs().map(|(k, _)| k.into_owned()).collect(),
        SurfaceTag::BodyForm => request
            .body
            .as_deref()
            .and_then(|b| std::str::from_utf8(b).ok())
            .map(|s| form_urlencoded::parse(s.as_bytes()).map(|(k, _)| k.into_owned()).collect())
            .unwrap_or_default(),
        SurfaceTag::BodyJson => request
            .body
            .as_deref()
            .and_then(|b| serde_json::from_slice::<serde_json::Value>(b).ok())
            .and_then(|v| v.as_object().map(|m| m.keys().cloned().collect()))
            .unwrap_or_default(),
        SurfaceTag::Header => request.headers.iter().map(|(k, _)| k.to_ascii_lowercase()).collect(),
        SurfaceTag::Cookie => request
            .header("cookie")
            .map(|c| c.split(';').filter_map(|p| p.split_once('=').map(|(k, _)| k.trim().to_string())).collect())
            .unwrap_or_default(),
    }
}

/// The deduplicated candidate list for `surface`: the surface's configured
/// wordlist plus any externally-contributed `additional_names`, minus names
/// the target already accepts.
fn surface_wordlist(request: &RequestInfo, wordlists: &Wordlists, surface: SurfaceTag) -> Vec<String> {
    let existing = existing_names(request, surface);
    let mut seen = HashSet::new();
    wordlists
        .for_surface(surface)
        .iter()
        .chain(request.additional_for(surface).iter())
        .filter(|name| !existing.contains(name.as_str()))
        .filter(|name| seen.insert((*name).clone()))
        .cloned()
        .collect()
}

fn longest_wordlist_name(wordlists: &Wordlists) -> usize {
    SurfaceTag::ALL.iter().flat_map(|s| wordlists.for_surface(*s)).map(String::len).max().unwrap_or(0)
}

/// Runs the full discovery phase over every `(request, enabled surface)` pair
/// and returns the accumulated result tree.
pub async fn run(mut requests: Vec<RequestInfo>, wordlists: &Wordlists, config: &Config, client: Client, logger: Logger) -> ResultTree {
    let finders = Arc::new(build_finders());
    let exec_cfg = ExecutorConfig {
        retry: config.retry,
        timeout: config.timeout,
        delay: config.delay,
        follow_redirects: config.follow_redirects,
    };
    let max_name_len = longest_wordlist_name(wordlists);
    let max_canary_len = crate::canary::max_canary_len();

    // Step 2: prepare a canary on every (request, surface) the finder accepts.
    for request in requests.iter_mut() {
        for &surface in &config.enabled_surfaces {
            let finder = finders[&surface].as_ref();
            let wordlist = surface_wordlist(request, wordlists, surface);
            if finder.is_searchable(request, &wordlist) {
                request.canaries.entry(surface).or_insert_with(Canary::generate);
            } else {
                logger.debug(format!("{}: {}", request.origin_url, SurfaceError::NotSearchable(surface)));
            }
        }
    }

    // Step 3: bucket-size every (host, surface) pair once, via a
    // threads-bounded pool; the cache makes repeats for the same host free.
    let bucket_cache = BucketCache::new();
    let bucket_jobs: Vec<(usize, SurfaceTag)> = requests
        .iter()
        .enumerate()
        .flat_map(|(idx, request)| {
            config
                .enabled_surfaces
                .iter()
                .copied()
                .filter(move |&surface| request.canaries.contains_key(&surface) && config.dynamic_sizing_enabled(surface))
                .map(move |surface| (idx, surface))
        })
        .collect();

    let bucket_results: Vec<(usize, SurfaceTag, Option<usize>)> = stream::iter(bucket_jobs.into_iter().map(|(idx, surface)| {
        let finders = finders.clone();
        let client = client.clone();
        let exec_cfg = exec_cfg.clone();
        let bucket_cache = bucket_cache.clone();
        let request = requests[idx].clone();
        async move {
            let finder = finders[&surface].as_ref();
            let size =
                bucket::determine_bucket_size(&bucket_cache, &request, finder, &client, &exec_cfg, max_name_len, max_canary_len, &logger)
                    .await;
            (idx, surface, size)
        }
    }))
    .buffer_unordered(config.threads.max(1))
    .collect()
    .await;

    for (idx, surface, size) in bucket_results {
        requests[idx].bucket_sizes.insert(surface, size);
    }

    // Step 4: generate initial chunks for every searchable (request, surface).
    let mut initial_items = Vec::new();
    let mut seq: u64 = 0;
    for (idx, request) in requests.iter().enumerate() {
        for &surface in &config.enabled_surfaces {
            if !request.canaries.contains_key(&surface) {
                continue;
            }
            let finder = finders[&surface].as_ref();
            let pre_existing = finder.pre_existing_size(request);

            let total_bucket = if config.dynamic_sizing_enabled(surface) {
                match request.bucket_sizes.get(&surface).copied().flatten() {
                    Some(size) => size,
                    None => {
                        logger.error(format!("{}: {}", request.origin_url, SurfaceError::NoBucketSize(surface)));
                        continue;
                    }
                }
            } else {
                config.fixed_bucket_for(surface) + pre_existing
            };

            let budget = total_bucket.saturating_sub(pre_existing).max(finder.min_chunk_size(max_name_len, max_canary_len));
            let wordlist = surface_wordlist(request, wordlists, surface);
            if wordlist.is_empty() {
                continue;
            }

            for names in finder.word_chunks(&wordlist, budget, max_canary_len) {
                initial_items.push(WorkItem { request_idx: idx, surface, names, priority: 0, seq, retries: 0 });
                seq += 1;
            }
        }
    }

    let requests = Arc::new(requests);
    scheduler::drain(config.threads.max(1), initial_items, requests, finders, client, exec_cfg, logger).await
}
