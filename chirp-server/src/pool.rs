//! Render worker pool
//!
//! A fixed number of long-lived worker threads consume render jobs from a
//! shared channel and reply over oneshot channels. Every render, single or
//! batch-item, goes through this pool, so the request-accepting tokio
//! runtime never performs CPU-bound work itself and health/stat queries stay
//! responsive however many renders are in flight.
//!
//! Jobs run to completion once dispatched: there is no mid-flight
//! cancellation, and a worker finding its reply channel closed still finishes
//! and populates the cache, which is safe because the cache is independent of
//! any specific caller.

use chirp_core::{cache::CacheKey, ClipCache, ClipRequest, Error, RenderedClip, Result};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Default worker count, bounding peak CPU and memory use
pub const DEFAULT_WORKERS: usize = 4;

struct RenderJob {
    request: ClipRequest,
    reply: oneshot::Sender<Result<(Arc<RenderedClip>, bool)>>,
}

/// Fixed-size pool of render workers sharing one clip cache
pub struct RenderPool {
    sender: Mutex<Option<mpsc::Sender<RenderJob>>>,
    workers: Vec<JoinHandle<()>>,
    worker_count: usize,
}

impl RenderPool {
    /// Spawn `workers` threads consuming from a shared job queue
    pub fn new(workers: usize, cache: Arc<ClipCache>) -> Self {
        let worker_count = workers.max(1);
        let (tx, rx) = mpsc::channel::<RenderJob>();
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let rx = Arc::clone(&rx);
            let cache = Arc::clone(&cache);
            let handle = std::thread::Builder::new()
                .name(format!("render-{id}"))
                .spawn(move || worker_loop(id, rx, cache))
                .expect("failed to spawn render worker");
            handles.push(handle);
        }

        info!("Render pool started with {} workers", worker_count);
        Self {
            sender: Mutex::new(Some(tx)),
            workers: handles,
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Dispatch one render job and await its result.
    ///
    /// The boolean in the result reports whether the clip came from cache.
    /// Suspends only the calling task; the render itself runs on a pool
    /// thread.
    pub async fn render(&self, request: ClipRequest) -> Result<(Arc<RenderedClip>, bool)> {
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let sender = match self.sender.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let Some(sender) = sender.as_ref() else {
                return Err(Error::Internal("render pool is shut down".to_string()));
            };
            sender
                .send(RenderJob {
                    request,
                    reply: reply_tx,
                })
                .map_err(|_| Error::Internal("render pool is shut down".to_string()))?;
        }

        reply_rx
            .await
            .map_err(|_| Error::Internal("render worker dropped job reply".to_string()))?
    }

    /// Close the job queue and join every worker
    pub fn shutdown(&mut self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("Render worker panicked during shutdown");
            }
        }
    }
}

impl Drop for RenderPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker loop: cache lookup, extract on miss, cache insert on success
fn worker_loop(id: usize, rx: Arc<Mutex<mpsc::Receiver<RenderJob>>>, cache: Arc<ClipCache>) {
    loop {
        let job = {
            let guard = match rx.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.recv()
        };
        let Ok(job) = job else {
            debug!("Render worker {} exiting", id);
            return;
        };

        // A panicking render costs one job, not the worker thread
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            process_job(&job.request, &cache)
        }))
        .unwrap_or_else(|_| {
            warn!("Render worker {} job panicked", id);
            Err(Error::Internal("render job panicked".to_string()))
        });
        if job.reply.send(result).is_err() {
            // Caller abandoned the request (timeout at their layer); the
            // cache insert above still happened, so the work is not wasted
            debug!("Render worker {} reply channel closed", id);
        }
    }
}

fn process_job(request: &ClipRequest, cache: &ClipCache) -> Result<(Arc<RenderedClip>, bool)> {
    let key = CacheKey::new(
        &request.file_path,
        request.start_time,
        request.end_time,
        &request.settings,
    );

    if let Some(hit) = cache.get(&key) {
        debug!(
            "Cache hit for {} [{:.3}s - {:.3}s]",
            request.file_path, request.start_time, request.end_time
        );
        return Ok((hit, true));
    }

    let rendered = Arc::new(chirp_core::extract(request)?);
    // Best-effort: a cache failure must never fail a successful render
    cache.put(key, Arc::clone(&rendered));
    Ok((rendered, false))
}
