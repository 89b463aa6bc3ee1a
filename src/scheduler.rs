//! Priority Work Scheduler: a min-heap of work items drained by a fixed pool of
//! cooperative async workers (spec §4.5).
//!
//! Grounded on the teacher's `main.rs` concurrency pattern — `Arc<Mutex<_>>`
//! shared state feeding a bounded worker count — generalized from a flat
//! `buffer_unordered` stream into a priority `BinaryHeap` drained by workers
//! signaled through `tokio::sync::Notify`, mirroring the teacher's own
//! `Arc<Mutex<Vec<BustResult>>>` results pattern in `main.rs`.

use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::{Mutex, Notify};
use tokio::time::{timeout, Duration};

use crate::executor::ExecutorConfig;
use crate::finders::Finder;
use crate::logger::Logger;
use crate::request::RequestInfo;
use crate::results::{HitRecord, ResultTree};
use crate::surface::{SurfaceTag, Verdict, WorkItem};

/// Upper bound on how long an idle worker waits for a notification before
/// re-checking shutdown conditions; a safety net against a missed wakeup.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared scheduler state: the priority heap plus the bookkeeping needed to
/// detect "all workers idle and heap empty" (spec §4.5 step 4 / §5 shutdown).
pub struct Scheduler {
    heap: Mutex<BinaryHeap<WorkItem>>,
    notify: Notify,
    idle_workers: AtomicUsize,
    worker_count: usize,
    shutdown: AtomicBool,
    seq: AtomicU64,
}

impl Scheduler {
    pub fn new(worker_count: usize) -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            idle_workers: AtomicUsize::new(0),
            worker_count: worker_count.max(1),
            shutdown: AtomicBool::new(false),
            seq: AtomicU64::new(0),
        }
    }

    /// Monotonic insertion sequence, used to break priority ties FIFO.
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn push(&self, item: WorkItem) {
        {
            let mut heap = self.heap.lock().await;
            heap.push(item);
        }
        self.notify.notify_one();
    }

    async fn try_pop(&self) -> Option<WorkItem> {
        self.heap.lock().await.pop()
    }

    async fn is_empty(&self) -> bool {
        self.heap.lock().await.is_empty()
    }

    /// Registers this worker as idle; returns `true` once every worker is idle
    /// and the heap is confirmed empty, at which point shutdown is latched and
    /// all waiters are woken so they can observe it and exit.
    async fn mark_idle_and_wait(&self) -> bool {
        let idle = self.idle_workers.fetch_add(1, Ordering::SeqCst) + 1;
        if idle >= self.worker_count && self.is_empty().await {
            self.shutdown.store(true, Ordering::SeqCst);
            self.notify.notify_waiters();
            return true;
        }
        let _ = timeout(IDLE_POLL_INTERVAL, self.notify.notified()).await;
        self.idle_workers.fetch_sub(1, Ordering::SeqCst);
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Runs `worker_count` cooperative workers to exhaustion and returns the
/// accumulated result tree. `initial` seeds the heap before any worker starts.
pub async fn drain(
    worker_count: usize,
    initial: Vec<WorkItem>,
    requests: Arc<Vec<RequestInfo>>,
    finders: Arc<HashMap<SurfaceTag, Box<dyn Finder + Send + Sync>>>,
    client: Client,
    exec_cfg: ExecutorConfig,
    logger: Logger,
) -> ResultTree {
    let scheduler = Arc::new(Scheduler::new(worker_count));
    for item in initial {
        scheduler.push(item).await;
    }

    let results = Arc::new(Mutex::new(ResultTree::new()));
    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let scheduler = scheduler.clone();
        let requests = requests.clone();
        let finders = finders.clone();
        let client = client.clone();
        let exec_cfg = exec_cfg.clone();
        let results = results.clone();
        let logger = logger;
        handles.push(tokio::spawn(async move {
            worker_loop(scheduler, requests, finders, client, exec_cfg, results, logger).await;
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    // Every spawned worker has exited and dropped its clone by this point, so
    // this `Arc` is the last reference.
    let results = Arc::try_unwrap(results).expect("all scheduler workers joined before unwrapping results");
    results.into_inner()
}

async fn worker_loop(
    scheduler: Arc<Scheduler>,
    requests: Arc<Vec<RequestInfo>>,
    finders: Arc<HashMap<SurfaceTag, Box<dyn Finder + Send + Sync>>>,
    client: Client,
    exec_cfg: ExecutorConfig,
    results: Arc<Mutex<ResultTree>>,
    logger: Logger,
) {
    loop {
        if scheduler.shutdown.load(Ordering::SeqCst) {
            return;
        }
        match scheduler.try_pop().await {
            Some(item) => {
                process_item(&scheduler, &requests, &finders, &client, &exec_cfg, &results, &logger, item).await;
            }
            None => {
                if scheduler.mark_idle_and_wait().await {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod process_item_tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::Method;
    use url::Url;

    use crate::finders::Finder;

    /// A `Finder` stub that always returns a fixed `Verdict`, ignoring the
    /// request entirely — enough to exercise `process_item`'s SPLIT/RETRY
    /// priority dispatch without any network I/O.
    struct StubFinder {
        verdict: Verdict,
    }

    #[async_trait]
    impl Finder for StubFinder {
        fn surface(&self) -> SurfaceTag {
            SurfaceTag::Url
        }
        fn is_searchable(&self, _request: &RequestInfo, _wordlist: &[String]) -> bool {
            true
        }
        fn pre_existing_size(&self, _request: &RequestInfo) -> usize {
            0
        }
        fn min_chunk_size(&self, _max_name_len: usize, _max_canary_len: usize) -> usize {
            1
        }
        fn word_chunks(&self, names: &[String], _bucket_size: usize, _max_canary_len: usize) -> Vec<Vec<String>> {
            vec![names.to_vec()]
        }
        async fn probe(&self, _request: &RequestInfo, _names: &[String], _client: &Client, _exec_cfg: &ExecutorConfig) -> Verdict {
            self.verdict.clone()
        }
        async fn probe_payload_size(
            &self,
            _request: &RequestInfo,
            _payload_size: usize,
            _client: &Client,
            _exec_cfg: &ExecutorConfig,
        ) -> Option<crate::executor::ExecutedResponse> {
            None
        }
    }

    fn test_request() -> RequestInfo {
        RequestInfo::new(Method::GET, Url::parse("https://example.com/").unwrap(), vec![], None)
    }

    fn test_exec_cfg() -> ExecutorConfig {
        ExecutorConfig {
            retry: 1,
            timeout: std::time::Duration::from_secs(1),
            delay: std::time::Duration::from_millis(0),
            follow_redirects: false,
        }
    }

    /// Spec §8 property #1 (chunk conservation) and #2 (split monotonicity):
    /// a SPLIT verdict's two children together carry exactly the original
    /// chunk's names, with priority `original+1`/`original+2`.
    #[tokio::test]
    async fn split_children_conserve_names_and_raise_priority() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
        let mid = names.len() / 2;
        let verdict = Verdict::Split {
            left: names[..mid].to_vec(),
            right: names[mid..].to_vec(),
        };

        let mut finders: HashMap<SurfaceTag, Box<dyn Finder + Send + Sync>> = HashMap::new();
        finders.insert(SurfaceTag::Url, Box::new(StubFinder { verdict }));

        let scheduler = Arc::new(Scheduler::new(1));
        let requests = Arc::new(vec![test_request()]);
        let finders = Arc::new(finders);
        let client = Client::new();
        let exec_cfg = test_exec_cfg();
        let results = Arc::new(Mutex::new(ResultTree::new()));
        let logger = Logger::default();

        let item = WorkItem {
            request_idx: 0,
            surface: SurfaceTag::Url,
            names: names.clone(),
            priority: 3,
            seq: scheduler.next_seq(),
            retries: 0,
        };
        process_item(&scheduler, &requests, &finders, &client, &exec_cfg, &results, &logger, item).await;

        let first = scheduler.try_pop().await.expect("left child queued");
        let second = scheduler.try_pop().await.expect("right child queued");
        assert!(scheduler.try_pop().await.is_none());

        assert_eq!(first.priority, 4);
        assert_eq!(second.priority, 5);

        let mut conserved: Vec<String> = first.names.iter().chain(second.names.iter()).cloned().collect();
        conserved.sort();
        let mut expected = names;
        expected.sort();
        assert_eq!(conserved, expected);
    }

    /// Spec §7: a second transport failure on the same chunk becomes DISCARD
    /// rather than an infinite re-queue.
    #[tokio::test]
    async fn retry_is_requeued_once_then_discarded() {
        let mut finders: HashMap<SurfaceTag, Box<dyn Finder + Send + Sync>> = HashMap::new();
        finders.insert(SurfaceTag::Url, Box::new(StubFinder { verdict: Verdict::Retry }));

        let scheduler = Arc::new(Scheduler::new(1));
        let requests = Arc::new(vec![test_request()]);
        let finders = Arc::new(finders);
        let client = Client::new();
        let exec_cfg = test_exec_cfg();
        let results = Arc::new(Mutex::new(ResultTree::new()));
        let logger = Logger::default();

        let names = vec!["debug".to_string()];
        let item = WorkItem {
            request_idx: 0,
            surface: SurfaceTag::Url,
            names: names.clone(),
            priority: 0,
            seq: scheduler.next_seq(),
            retries: 0,
        };
        process_item(&scheduler, &requests, &finders, &client, &exec_cfg, &results, &logger, item).await;

        let requeued = scheduler.try_pop().await.expect("first failure is requeued once");
        assert_eq!(requeued.retries, 1);
        assert_eq!(requeued.priority, 1);

        process_item(&scheduler, &requests, &finders, &client, &exec_cfg, &results, &logger, requeued).await;
        assert!(scheduler.try_pop().await.is_none(), "second failure on the same chunk must be discarded, not requeued");
    }
}

async fn process_item(
    scheduler: &Arc<Scheduler>,
    requests: &Arc<Vec<RequestInfo>>,
    finders: &Arc<HashMap<SurfaceTag, Box<dyn Finder + Send + Sync>>>,
    client: &Client,
    exec_cfg: &ExecutorConfig,
    results: &Arc<Mutex<ResultTree>>,
    logger: &Logger,
    item: WorkItem,
) {
    let Some(request) = requests.get(item.request_idx) else {
        return;
    };
    let Some(finder) = finders.get(&item.surface) else {
        return;
    };

    let verdict = finder.probe(request, &item.names, client, exec_cfg).await;

    match verdict {
        Verdict::Discard => {}
        Verdict::Retry if item.retries < 1 => {
            logger.debug(format!("{} retrying chunk of {} name(s)", item.surface, item.names.len()));
            scheduler
                .push(WorkItem {
                    request_idx: item.request_idx,
                    surface: item.surface,
                    names: item.names,
                    priority: item.priority + 1,
                    seq: scheduler.next_seq(),
                    retries: item.retries + 1,
                })
                .await;
        }
        Verdict::Retry => {
            logger.warning(format!(
                "{} discarding chunk of {} name(s) after retry exhaustion",
                item.surface,
                item.names.len()
            ));
        }
        Verdict::Split { left, right } => {
            scheduler
                .push(WorkItem {
                    request_idx: item.request_idx,
                    surface: item.surface,
                    names: left,
                    priority: item.priority + 1,
                    seq: scheduler.next_seq(),
                    retries: 0,
                })
                .await;
            scheduler
                .push(WorkItem {
                    request_idx: item.request_idx,
                    surface: item.surface,
                    names: right,
                    priority: item.priority + 2,
                    seq: scheduler.next_seq(),
                    retries: 0,
                })
                .await;
        }
        Verdict::Hit { name, reasons, response } => {
            logger.success(format!("{} {}: {}", request.origin_url, item.surface, name));
            let mut tree = results.lock().await;
            tree.record(&request.origin_url, item.surface, HitRecord { name, reasons, response });
        }
    }
}
