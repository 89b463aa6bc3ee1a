//! Bucket-Size Controller: the per-(host, surface) adaptive search that finds a
//! payload size maximizing bytes-per-probe over response-latency without
//! crossing server rejection thresholds (spec §4.4).
//!
//! No teacher analogue exists (`dirbuster-rs` scans a fixed wordlist with no
//! adaptive payload sizing) — this is new core logic, built the way the
//! teacher structures its own stateful async retry loop in
//! `buster::bust_url_with_retry`, and timed with `tokio::time::Instant` exactly
//! as the teacher's `DetailedResponse::response_time` is.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

use crate::executor::ExecutorConfig;
use crate::finders::Finder;
use crate::logger::Logger;
use crate::request::RequestInfo;
use crate::surface::SurfaceTag;

const INITIAL_LEFT: usize = 1024;
const INITIAL_CUR: usize = 2048;
const INITIAL_RIGHT: usize = 4096;
const MAX_ITERATIONS: usize = 5;

/// Per-host, per-surface cached bucket size. `in_progress` is the idempotent
/// guard the spec calls for: one host computes its bucket once.
#[derive(Debug, Clone, Default)]
struct BucketEntry {
    size: Option<usize>,
    in_progress: bool,
}

/// Explicitly-owned shared cache, passed by reference rather than kept as
/// global/static state (design note §9).
#[derive(Clone, Default)]
pub struct BucketCache {
    inner: Arc<Mutex<HashMap<String, HashMap<SurfaceTag, BucketEntry>>>>,
}

impl BucketCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Acceptance {
    Accepted,
    Rejected,
    Null,
}

fn classify(response_status: Option<u16>, baseline_status: u16, logger: &Logger) -> Acceptance {
    match response_status {
        None => Acceptance::Null,
        Some(status) if status == baseline_status => Acceptance::Accepted,
        Some(413) | Some(414) | Some(431) => Acceptance::Rejected,
        Some(status) if (400..600).contains(&status) && !(400..600).contains(&baseline_status) => {
            Acceptance::Rejected
        }
        Some(status) => {
            logger.debug(format!(
                "bucket controller: uncovered status combination (probe {status}, baseline {baseline_status}); treating as accepted"
            ));
            Acceptance::Accepted
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Triple {
    left: usize,
    cur: usize,
    right: usize,
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    left_bound: usize,
    right_bound: usize,
}

/// Re-centers the triple within `bounds` whenever a computed value escapes it
/// (spec §4.4: "When a candidate pointer escapes its bound, re-center...").
fn recenter_if_escaped(triple: Triple, bounds: Bounds) -> Triple {
    if triple.left < bounds.left_bound || triple.right > bounds.right_bound {
        let cur = bounds.left_bound + (bounds.right_bound - bounds.left_bound) / 2;
        let left = bounds.left_bound + (cur - bounds.left_bound) / 2;
        let right = cur + (bounds.right_bound - cur) / 2;
        Triple { left, cur, right }
    } else {
        triple
    }
}

fn shift_left(triple: Triple) -> Triple {
    Triple {
        left: triple.left / 2,
        cur: triple.left,
        right: triple.cur,
    }
}

fn shift_right(triple: Triple) -> Triple {
    Triple {
        left: triple.cur,
        cur: triple.right,
        right: triple.right.saturating_add(triple.right - triple.cur).max(triple.right + 1),
    }
}

fn narrow_around_cur(triple: Triple) -> Triple {
    Triple {
        left: (triple.left + triple.cur) / 2,
        cur: triple.cur,
        right: (triple.cur + triple.right) / 2,
    }
}

/// One (size, accepted-rate) sample taken during a bucket-sizing iteration.
struct Sample {
    size: usize,
    acceptance: Acceptance,
    rate: f64,
}

async fn probe_one(
    finder: &dyn Finder,
    request: &RequestInfo,
    size: usize,
    client: &Client,
    exec_cfg: &ExecutorConfig,
    baseline_status: u16,
    logger: &Logger,
) -> Sample {
    let response = finder.probe_payload_size(request, size, client, exec_cfg).await;
    let (acceptance, rate) = match &response {
        Some(r) => {
            let acc = classify(Some(r.status), baseline_status, logger);
            let secs = r.elapsed.as_secs_f64().max(0.001);
            (acc, size as f64 / secs)
        }
        None => (Acceptance::Null, 0.0),
    };
    Sample { size, acceptance, rate }
}

/// Runs the full adaptive search for one (request, surface) pair and returns
/// the raw optimal payload size found (without the pre-existing-size addend),
/// or `None` if no accepted sample was ever observed.
async fn search(
    finder: &dyn Finder,
    request: &RequestInfo,
    client: &Client,
    exec_cfg: &ExecutorConfig,
    logger: &Logger,
) -> (Option<usize>, usize) {
    let baseline_status = request
        .baseline_response
        .as_ref()
        .map(|b| b.status)
        .unwrap_or(200);

    let mut triple = Triple {
        left: INITIAL_LEFT,
        cur: INITIAL_CUR,
        right: INITIAL_RIGHT,
    };
    let mut bounds = Bounds {
        left_bound: 0,
        right_bound: usize::MAX,
    };

    let mut optimal_size: Option<usize> = None;
    let mut optimal_rate = 0.0f64;

    for _ in 0..MAX_ITERATIONS {
        if triple.left == 0 {
            break;
        }
        if triple.right - triple.cur < 2 || triple.cur - triple.left < 2 {
            break;
        }

        let (left_sample, cur_sample, right_sample) = tokio::join!(
            probe_one(finder, request, triple.left, client, exec_cfg, baseline_status, logger),
            probe_one(finder, request, triple.cur, client, exec_cfg, baseline_status, logger),
            probe_one(finder, request, triple.right, client, exec_cfg, baseline_status, logger),
        );

        for sample in [&left_sample, &cur_sample, &right_sample] {
            if sample.acceptance == Acceptance::Accepted && sample.rate > optimal_rate {
                optimal_rate = sample.rate;
                optimal_size = Some(sample.size);
            }
        }

        use Acceptance::*;
        let pattern = (left_sample.acceptance, cur_sample.acceptance, right_sample.acceptance);

        let next = match pattern {
            (Null, Null, Null) => {
                bounds.right_bound = triple.left;
                let right = bounds.right_bound;
                let cur = right >> 1;
                let left = cur >> 1;
                Triple { left, cur, right }
            }
            (Accepted, Accepted, Accepted) => {
                if left_sample.rate >= cur_sample.rate && left_sample.rate >= right_sample.rate {
                    bounds.right_bound = triple.right;
                    shift_left(triple)
                } else if right_sample.rate >= cur_sample.rate && right_sample.rate >= left_sample.rate {
                    bounds.left_bound = triple.left;
                    shift_right(triple)
                } else {
                    let narrowed = narrow_around_cur(triple);
                    bounds.left_bound = narrowed.left;
                    bounds.right_bound = narrowed.right;
                    narrowed
                }
            }
            (Accepted, Rejected, Rejected) => {
                bounds.right_bound = bounds.right_bound.min(triple.cur);
                shift_left(triple)
            }
            (Accepted, Accepted, Rejected) => {
                bounds.right_bound = bounds.right_bound.min(triple.right);
                if left_sample.rate >= cur_sample.rate {
                    shift_left(triple)
                } else {
                    let narrowed = narrow_around_cur(triple);
                    bounds.left_bound = narrowed.left;
                    bounds.right_bound = bounds.right_bound.min(narrowed.right);
                    narrowed
                }
            }
            _ => shift_left(triple),
        };

        triple = recenter_if_escaped(next, bounds);
    }

    (optimal_size, bounds.right_bound)
}

/// Determines the bucket size for `(request.netloc, finder.surface())`, using
/// the shared cache so repeated calls for the same host/surface are free
/// (spec §8 property 3: bucket-size idempotence).
pub async fn determine_bucket_size(
    cache: &BucketCache,
    request: &RequestInfo,
    finder: &dyn Finder,
    client: &Client,
    exec_cfg: &ExecutorConfig,
    max_name_len: usize,
    max_canary_len: usize,
    logger: &Logger,
) -> Option<usize> {
    let surface = finder.surface();
    let netloc = request.netloc.clone();

    loop {
        let mut guard = cache.inner.lock().await;
        let host_entry = guard.entry(netloc.clone()).or_default();
        match host_entry.entry(surface).or_default() {
            entry if entry.size.is_some() => return entry.size,
            entry if entry.in_progress => {
                drop(guard);
                sleep(Duration::from_millis(25)).await;
                continue;
            }
            entry => {
                entry.in_progress = true;
            }
        }
        drop(guard);
        break;
    }

    let (optimal_size, right_bound) = search(finder, request, client, exec_cfg, logger).await;
    let pre_existing = finder.pre_existing_size(request);
    let min_chunk = finder.min_chunk_size(max_name_len, max_canary_len);

    let resolved = optimal_size.map(|size| {
        if size < min_chunk && min_chunk < right_bound {
            min_chunk + pre_existing
        } else {
            size + pre_existing
        }
    });

    let mut guard = cache.inner.lock().await;
    let host_entry = guard.entry(netloc).or_default();
    let entry = host_entry.entry(surface).or_default();
    entry.size = resolved;
    entry.in_progress = false;

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_matches_baseline_status_as_accepted() {
        let logger = Logger::default();
        assert_eq!(classify(Some(200), 200, &logger), Acceptance::Accepted);
    }

    #[test]
    fn classify_413_414_431_are_rejected() {
        let logger = Logger::default();
        for status in [413, 414, 431] {
            assert_eq!(classify(Some(status), 200, &logger), Acceptance::Rejected);
        }
    }

    #[test]
    fn classify_unexpected_4xx_against_2xx_baseline_is_rejected() {
        let logger = Logger::default();
        assert_eq!(classify(Some(403), 200, &logger), Acceptance::Rejected);
    }

    #[test]
    fn classify_4xx_baseline_keeps_matching_4xx_as_rejected_unless_equal() {
        let logger = Logger::default();
        // baseline itself is 404; a probe returning 404 matches baseline exactly.
        assert_eq!(classify(Some(404), 404, &logger), Acceptance::Accepted);
    }

    #[test]
    fn classify_none_is_null() {
        let logger = Logger::default();
        assert_eq!(classify(None, 200, &logger), Acceptance::Null);
    }

    #[test]
    fn recenter_triggers_only_when_escaping_bounds() {
        let bounds = Bounds { left_bound: 100, right_bound: 1000 };
        let inside = Triple { left: 150, cur: 500, right: 900 };
        let unchanged = recenter_if_escaped(inside, bounds);
        assert_eq!(unchanged.left, inside.left);
        assert_eq!(unchanged.right, inside.right);

        let escaping = Triple { left: 50, cur: 500, right: 900 };
        let recentered = recenter_if_escaped(escaping, bounds);
        assert!(recentered.left >= bounds.left_bound);
        assert!(recentered.right <= bounds.right_bound);
    }
}
