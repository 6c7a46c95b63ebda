//! Asynchronous rendering through a long-lived engine thread.
//!
//! [`RenderWorker`] owns one [`RenderEngine`] on a dedicated thread and feeds
//! it requests tagged with fresh ids. A second thread drains the engine's
//! responses and resolves the caller waiting on the matching id, so any
//! number of renders can be in flight at once and may complete in any order.
//! A [`LruCache`] in front of the engine answers repeated inputs without
//! rendering them again.

mod engine;
mod protocol;

#[cfg(feature = "graphviz")]
pub use engine::GraphvizEngine;
pub use engine::RenderEngine;
pub use protocol::{
    Diagnostic, RenderOptions, RenderRequest, RenderResponse, RenderResult, RenderStatus,
    Severity,
};

use std::{
    any::Any,
    collections::HashMap,
    io,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use log::{debug, error, info, trace, warn};
use tokio::sync::{mpsc, oneshot};

use crate::{cache::LruCache, codec, config::WorkerConfig, error::RenderError, hash};

/// What the engine thread reports back to the dispatcher.
#[derive(Debug)]
enum EngineEvent {
    Response(RenderResponse),
    Fault { id: u64, message: String },
}

/// Callers waiting for a response, keyed by request id.
#[derive(Debug, Default)]
struct PendingTable {
    handlers: Mutex<HashMap<u64, oneshot::Sender<RenderResult>>>,
}

impl PendingTable {
    fn register(&self, id: u64, handler: oneshot::Sender<RenderResult>) {
        self.lock().insert(id, handler);
    }

    fn take(&self, id: u64) -> Option<oneshot::Sender<RenderResult>> {
        self.lock().remove(&id)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    /// Drop every handler, failing the callers still waiting.
    fn close(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<RenderResult>>> {
        self.handlers.lock().expect("failed to lock pending requests")
    }
}

/// Removes a pending entry when its request is abandoned.
///
/// Taking an id that the dispatcher already resolved is a no-op.
struct PendingGuard<'a> {
    table: &'a PendingTable,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.table.take(self.id).is_some() {
            debug!(id = self.id; "Abandoned pending render request");
        }
    }
}

/// Handle to a render engine running on its own thread.
///
/// Dropping the handle closes the request queue, which stops the engine
/// thread after its current render and then the dispatcher thread.
pub struct RenderWorker {
    requests: mpsc::UnboundedSender<RenderRequest>,
    pending: Arc<PendingTable>,
    next_id: AtomicU64,
    engine_version: String,
    cache: Option<Arc<LruCache>>,
    request_timeout: Option<Duration>,
}

impl RenderWorker {
    /// Start `engine` on a dedicated thread.
    ///
    /// Request timeouts are measured with the tokio timer, so
    /// [`render_string`](Self::render_string) must then run inside a tokio
    /// runtime with the time driver enabled.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a worker thread can not be spawned.
    pub fn spawn<E>(
        engine: E,
        cache: Option<Arc<LruCache>>,
        config: &WorkerConfig,
    ) -> io::Result<Self>
    where
        E: RenderEngine + 'static,
    {
        let engine_version = engine.version().to_string();
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(PendingTable::default());

        thread::Builder::new()
            .name("typeviz-engine".to_string())
            .spawn(move || run_engine(engine, request_rx, event_tx))?;

        let dispatcher_pending = Arc::clone(&pending);
        thread::Builder::new()
            .name("typeviz-dispatcher".to_string())
            .spawn(move || dispatch_events(event_rx, &dispatcher_pending))?;

        info!(engine_version, cached = cache.is_some(); "Render worker started");

        Ok(Self {
            requests: request_tx,
            pending,
            next_id: AtomicU64::new(0),
            engine_version,
            cache,
            request_timeout: config.request_timeout(),
        })
    }

    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    /// Number of requests still waiting for the engine.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Cache key for `dot`, or `None` when content hashing is unavailable.
    pub fn cache_key(&self, dot: &str) -> Option<String> {
        hash::compute_hash(dot).map(|hash| format!("worker:{}:dot:{hash}", self.engine_version))
    }

    /// Render DOT text to SVG.
    ///
    /// Cached results are returned without contacting the engine. Cache
    /// failures are logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the engine reports diagnostics, answers
    /// without output, stops running, or exceeds the configured timeout.
    pub async fn render_string(&self, dot: &str) -> Result<String, RenderError> {
        let cache_key = self.cache_key(dot);

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            match cache.get(key) {
                Ok(Some(blob)) => match codec::decompress(&blob) {
                    Ok(svg) => {
                        info!(key; "SVG cached");
                        return Ok(svg);
                    }
                    Err(err) => warn!(err:%, key; "Can not decode cached SVG"),
                },
                Ok(None) => {}
                Err(err) => warn!(err:%; "Can not read cache"),
            }
        }

        let svg = self.render_uncached(dot).await?;

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Err(err) = cache.set(key, &codec::compress(&svg)) {
                warn!(err:%; "Can not write cache");
            }
        }

        Ok(svg)
    }

    async fn render_uncached(&self, dot: &str) -> Result<String, RenderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (handler, response) = oneshot::channel();

        self.pending.register(id, handler);
        let _guard = PendingGuard {
            table: &self.pending,
            id,
        };

        self.requests
            .send(RenderRequest::new(id, dot))
            .map_err(|_| RenderError::ChannelClosed)?;

        let started = Instant::now();
        let result = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, response)
                .await
                .map_err(|_| RenderError::Timeout(limit))?,
            None => response.await,
        }
        .map_err(|_| RenderError::ChannelClosed)?;

        debug!(id, elapsed_ms = started.elapsed().as_millis(); "Rendering SVG finished");
        result.into_output()
    }
}

impl std::fmt::Debug for RenderWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderWorker")
            .field("engine_version", &self.engine_version)
            .field("cache", &self.cache)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

fn run_engine<E: RenderEngine>(
    mut engine: E,
    mut requests: mpsc::UnboundedReceiver<RenderRequest>,
    events: mpsc::UnboundedSender<EngineEvent>,
) {
    while let Some(request) = requests.blocking_recv() {
        trace!(id = request.id; "Engine received request");

        let event = match panic::catch_unwind(AssertUnwindSafe(|| engine.render(&request))) {
            Ok(result) => EngineEvent::Response(RenderResponse {
                id: request.id,
                result,
            }),
            Err(payload) => EngineEvent::Fault {
                id: request.id,
                message: panic_message(payload.as_ref()),
            },
        };

        if events.send(event).is_err() {
            break;
        }
    }
    debug!("Engine thread stopped");
}

fn dispatch_events(mut events: mpsc::UnboundedReceiver<EngineEvent>, pending: &PendingTable) {
    while let Some(event) = events.blocking_recv() {
        match event {
            EngineEvent::Response(RenderResponse { id, result }) => match pending.take(id) {
                Some(handler) => {
                    // The caller may have stopped waiting in the meantime.
                    let _ = handler.send(result);
                }
                None => warn!(id; "Response for unknown render request"),
            },
            EngineEvent::Fault { id, message } => {
                error!(id, message; "Unexpected error from render engine");
            }
        }
    }
    pending.close();
    debug!("Dispatcher thread stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "engine panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tokio::task::JoinSet;

    use super::*;
    use crate::cache::MemoryStorage;

    /// Echoes the input wrapped in an `<svg>` element.
    struct EchoEngine;

    impl RenderEngine for EchoEngine {
        fn version(&self) -> &str {
            "echo-1"
        }

        fn render(&mut self, request: &RenderRequest) -> RenderResult {
            RenderResult::success(format!("<svg>{}</svg>", request.input))
        }
    }

    /// Counts renders through a shared counter.
    struct CountingEngine(Arc<AtomicUsize>);

    impl RenderEngine for CountingEngine {
        fn version(&self) -> &str {
            "counting-1"
        }

        fn render(&mut self, request: &RenderRequest) -> RenderResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            RenderResult::success(format!("<svg>{}</svg>", request.input))
        }
    }

    /// Panics on inputs containing `boom`, fails on `bad` and `broken`.
    struct FaultyEngine;

    impl RenderEngine for FaultyEngine {
        fn version(&self) -> &str {
            "faulty-1"
        }

        fn render(&mut self, request: &RenderRequest) -> RenderResult {
            if request.input.contains("boom") {
                panic!("engine exploded");
            }
            if request.input.contains("bad") {
                return RenderResult::failure(vec![
                    Diagnostic::new(Severity::Error, "syntax error in line 1"),
                    Diagnostic::new(Severity::Warning, "ignored attribute"),
                ]);
            }
            if request.input.contains("broken") {
                return RenderResult::failure(vec![Diagnostic::new(
                    Severity::Error,
                    "unexpected end of input",
                )]);
            }
            if request.input.contains("empty") {
                return RenderResult {
                    status: RenderStatus::Success,
                    output: None,
                    errors: Vec::new(),
                };
            }
            RenderResult::success("<svg/>")
        }
    }

    fn memory_cache() -> Arc<LruCache> {
        Arc::new(LruCache::new(MemoryStorage::new(), "Test", 10))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_requests_get_their_own_results() {
        let worker =
            Arc::new(RenderWorker::spawn(EchoEngine, None, &WorkerConfig::default()).unwrap());

        let mut tasks = JoinSet::new();
        for i in 0..32 {
            let worker = Arc::clone(&worker);
            tasks.spawn(async move {
                let input = format!("digraph {{ n{i} }}");
                let svg = worker.render_string(&input).await.unwrap();
                (input, svg)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (input, svg) = joined.unwrap();
            assert_eq!(svg, format!("<svg>{input}</svg>"));
        }
        assert_eq!(worker.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_engine() {
        let renders = Arc::new(AtomicUsize::new(0));
        let cache = memory_cache();
        let worker = RenderWorker::spawn(
            CountingEngine(Arc::clone(&renders)),
            Some(Arc::clone(&cache)),
            &WorkerConfig::default(),
        )
        .unwrap();

        let first = worker.render_string("digraph { a }").await.unwrap();
        let second = worker.render_string("digraph { a }").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(renders.load(Ordering::SeqCst), 1);

        let key = worker.cache_key("digraph { a }").unwrap();
        assert!(key.starts_with("worker:counting-1:dot:"));
        let blob = cache.get(&key).unwrap().unwrap();
        assert!(blob.starts_with("data:application/x-lz4;base64,"));
    }

    #[tokio::test]
    async fn test_undecodable_cache_entry_is_a_miss() {
        let renders = Arc::new(AtomicUsize::new(0));
        let cache = memory_cache();
        let worker = RenderWorker::spawn(
            CountingEngine(Arc::clone(&renders)),
            Some(Arc::clone(&cache)),
            &WorkerConfig::default(),
        )
        .unwrap();

        let key = worker.cache_key("digraph { b }").unwrap();
        cache.set(&key, "data:application/gzip;base64,AAAA").unwrap();

        let svg = worker.render_string("digraph { b }").await.unwrap();
        assert_eq!(svg, "<svg>digraph { b }</svg>");
        assert_eq!(renders.load(Ordering::SeqCst), 1);

        // The fresh render replaced the unusable entry.
        assert!(cache.get(&key).unwrap().unwrap().starts_with("data:application/x-lz4"));
    }

    #[tokio::test]
    async fn test_diagnostics_reject_render() {
        let worker = RenderWorker::spawn(FaultyEngine, None, &WorkerConfig::default()).unwrap();

        let err = worker.render_string("bad").await.unwrap_err();
        let diagnostics = match err {
            RenderError::Diagnostics(diagnostics) => diagnostics,
            other => panic!("expected diagnostics, got {other:?}"),
        };
        let messages: Vec<_> = diagnostics.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            ["error : syntax error in line 1", "warning : ignored attribute"]
        );

        assert!(matches!(
            worker.render_string("empty").await,
            Err(RenderError::InvalidResponse)
        ));
    }

    #[tokio::test]
    async fn test_rejected_render_fails_only_its_own_call() {
        let worker = RenderWorker::spawn(FaultyEngine, None, &WorkerConfig::default()).unwrap();

        match worker.render_string("broken").await {
            Err(RenderError::Diagnostics(diagnostics)) => {
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].to_string(), "error : unexpected end of input");
            }
            other => panic!("expected diagnostics, got {other:?}"),
        }

        assert_eq!(worker.render_string("fine").await.unwrap(), "<svg/>");
        assert_eq!(worker.pending_requests(), 0);
    }

    #[test]
    fn test_dispatcher_matches_responses_by_id() {
        let pending = Arc::new(PendingTable::default());
        let (events, receiver) = mpsc::unbounded_channel();

        let mut waiters = Vec::new();
        for id in 0..8 {
            let (handler, waiter) = oneshot::channel();
            pending.register(id, handler);
            waiters.push((id, waiter));
        }
        let (handler, faulted) = oneshot::channel();
        pending.register(100, handler);

        let dispatcher = {
            let pending = Arc::clone(&pending);
            thread::spawn(move || dispatch_events(receiver, &pending))
        };

        let response = |id: u64, output: &str| {
            EngineEvent::Response(RenderResponse {
                id,
                result: RenderResult::success(output),
            })
        };
        for id in [5, 2, 7, 0, 3] {
            events.send(response(id, &format!("<svg>{id}</svg>"))).unwrap();
        }
        events.send(response(99, "<svg>stray</svg>")).unwrap();
        events
            .send(EngineEvent::Fault {
                id: 100,
                message: "engine exploded".to_string(),
            })
            .unwrap();
        for id in [6, 1, 4] {
            events.send(response(id, &format!("<svg>{id}</svg>"))).unwrap();
        }

        // Responses are handled in send order, so once the last one arrives
        // the stray response and the fault have been handled too.
        for (id, waiter) in waiters.into_iter().rev() {
            let result = waiter.blocking_recv().unwrap();
            assert_eq!(result.into_output().unwrap(), format!("<svg>{id}</svg>"));
        }
        assert_eq!(pending.len(), 1);

        drop(events);
        dispatcher.join().unwrap();

        assert_eq!(pending.len(), 0);
        assert!(faulted.blocking_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_render_is_not_cached() {
        let cache = memory_cache();
        let worker =
            RenderWorker::spawn(FaultyEngine, Some(Arc::clone(&cache)), &WorkerConfig::default())
                .unwrap();

        assert!(worker.render_string("bad").await.is_err());
        assert!(cache.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_engine_panic_is_isolated() {
        let config = WorkerConfig::with_request_timeout(Duration::from_millis(200));
        let worker = RenderWorker::spawn(FaultyEngine, None, &config).unwrap();

        let err = worker.render_string("boom").await.unwrap_err();
        assert!(matches!(err, RenderError::Timeout(_)));
        assert_eq!(worker.pending_requests(), 0);

        // The engine thread keeps serving later requests.
        assert_eq!(worker.render_string("fine").await.unwrap(), "<svg/>");
    }

    #[tokio::test]
    async fn test_timeout_frees_pending_slot() {
        struct SlowEngine;

        impl RenderEngine for SlowEngine {
            fn version(&self) -> &str {
                "slow-1"
            }

            fn render(&mut self, _request: &RenderRequest) -> RenderResult {
                thread::sleep(Duration::from_millis(300));
                RenderResult::success("<svg/>")
            }
        }

        let config = WorkerConfig::with_request_timeout(Duration::from_millis(50));
        let worker = RenderWorker::spawn(SlowEngine, None, &config).unwrap();

        let err = worker.render_string("digraph {}").await.unwrap_err();
        assert!(matches!(err, RenderError::Timeout(limit) if limit == Duration::from_millis(50)));
        assert_eq!(worker.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_dropped_future_frees_pending_slot() {
        struct BlockedEngine(std::sync::mpsc::Receiver<()>);

        impl RenderEngine for BlockedEngine {
            fn version(&self) -> &str {
                "blocked-1"
            }

            fn render(&mut self, _request: &RenderRequest) -> RenderResult {
                let _ = self.0.recv();
                RenderResult::success("<svg/>")
            }
        }

        let (release, blocked) = std::sync::mpsc::channel();
        let worker =
            RenderWorker::spawn(BlockedEngine(blocked), None, &WorkerConfig::default()).unwrap();

        {
            let render = worker.render_string("digraph {}");
            tokio::pin!(render);
            let waited = tokio::time::timeout(Duration::from_millis(20), &mut render).await;
            assert!(waited.is_err());
            assert_eq!(worker.pending_requests(), 1);
        }
        assert_eq!(worker.pending_requests(), 0);

        release.send(()).unwrap();
    }

    #[tokio::test]
    async fn test_closed_pending_table_reports_channel_closed() {
        let pending = PendingTable::default();
        let (handler, response) = oneshot::channel();
        pending.register(1, handler);
        pending.close();

        assert!(response.await.is_err());
        assert_eq!(pending.len(), 0);
    }

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload = panic::catch_unwind(|| panic!("{} message", "formatted")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted message");
    }
}
