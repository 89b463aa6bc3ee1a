//! The `Finder` trait and its five per-surface implementations.
//!
//! Grounded on the teacher's `buster.rs` request-building style
//! (`reqwest::RequestBuilder` chaining), generalized from "GET a fixed word onto
//! a path" to "inject a chunk of candidate names into one of five surfaces".
//! Each finder is boxed behind `Box<dyn Finder + Send + Sync>` — design note §9
//! calls this out explicitly: a trait object's vtable already is the "surface
//! tag + function table" the distilled design asks for, so no extra dispatch
//! layer is layered on top of it.

pub mod body_form;
pub mod body_json;
pub mod cookie;
pub mod header;
pub mod url;

use async_trait::async_trait;
use reqwest::Client;

use crate::analyzer;
use crate::executor::{ExecutedResponse, ExecutorConfig};
use crate::request::RequestInfo;
use crate::surface::{SurfaceTag, Verdict};

/// Common contract every per-surface finder implements (spec §4.3).
#[async_trait]
pub trait Finder: Send + Sync {
    fn surface(&self) -> SurfaceTag;

    /// Whether `request` can be probed at all on this surface, given the
    /// deduplicated wordlist configured for it.
    fn is_searchable(&self, request: &RequestInfo, wordlist: &[String]) -> bool;

    /// Bytes (or, for the header surface, header count) already consumed by the
    /// original request on this surface — subtracted from the bucket budget.
    fn pre_existing_size(&self, request: &RequestInfo) -> usize;

    /// Minimum size (bytes, or header count) needed to carry exactly one name
    /// plus its canary in a single probe.
    fn min_chunk_size(&self, max_name_len: usize, max_canary_len: usize) -> usize;

    /// Partitions `names` into chunks that fit within `bucket_size` units.
    fn word_chunks(&self, names: &[String], bucket_size: usize, max_canary_len: usize) -> Vec<Vec<String>>;

    /// Sends one probe carrying `names` injected with this request's per-surface
    /// canary and interprets the analyzer's verdict (DISCARD/HIT/SPLIT). Returns
    /// `Verdict::Retry` if the executor could not get a response at all.
    async fn probe(
        &self,
        request: &RequestInfo,
        names: &[String],
        client: &Client,
        exec_cfg: &ExecutorConfig,
    ) -> Verdict;

    /// Sends a single bucket-sizing probe carrying roughly `payload_size` units
    /// of filler, with no real candidate names — used only by the bucket
    /// controller to measure acceptance/latency at a given size.
    async fn probe_payload_size(
        &self,
        request: &RequestInfo,
        payload_size: usize,
        client: &Client,
        exec_cfg: &ExecutorConfig,
    ) -> Option<ExecutedResponse>;
}

/// Shared verdict interpretation: empty reasons -> DISCARD; non-empty with one
/// name -> HIT; non-empty with >=2 names -> SPLIT in half (spec §4.2/§4.3).
pub(crate) fn interpret_reasons(
    reasons: Vec<crate::surface::Reason>,
    names: &[String],
    response: ExecutedResponse,
) -> Verdict {
    if reasons.is_empty() {
        return Verdict::Discard;
    }
    if names.len() == 1 {
        return Verdict::Hit {
            name: names[0].clone(),
            reasons,
            response: Some(response),
        };
    }
    let mid = names.len() / 2;
    Verdict::Split {
        left: names[..mid].to_vec(),
        right: names[mid..].to_vec(),
    }
}

/// Greedy byte-budget chunking shared by the URL, Body-Form, and Cookie
/// finders: pack names into a chunk while `per_name_overhead + name.len()`
/// stays within `bucket_size`; start a new chunk once it would overflow.
pub(crate) fn greedy_byte_chunks(
    names: &[String],
    bucket_size: usize,
    per_name_overhead: usize,
) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    let mut current_size = 0usize;
    for name in names {
        let cost = per_name_overhead + name.len();
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

/// Runs the analyzer against a fresh probe response and interprets the result,
/// the common tail shared by every finder's `probe` implementation.
pub(crate) fn finish_probe(
    request: &RequestInfo,
    names: &[String],
    response: Option<ExecutedResponse>,
    canary: &crate::canary::Canary,
    surface: SurfaceTag,
) -> Verdict {
    let Some(response) = response else {
        return Verdict::Retry;
    };
    let baseline = request
        .baseline_response
        .as_ref()
        .expect("probing requires a captured baseline");
    let reasons = analyzer::analyze(baseline, request.baseline_html_tag_count, &response, canary, surface);
    interpret_reasons(reasons, names, response)
}

/// A padding value of exactly `len` filler characters, used by bucket-sizing
/// probes that need to occupy a target number of bytes without claiming a real
/// candidate name.
pub(crate) fn padding_value(len: usize) -> String {
    "a".repeat(len)
}
