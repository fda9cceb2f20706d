//! Batch render coordination
//!
//! Fans a list of clip requests out across the render pool with a bounded
//! number in flight, preserving input order in the output regardless of
//! completion order. One item failing (missing file, decode error) produces
//! an error outcome for that item only; sibling items are unaffected.

use crate::pool::RenderPool;
use chirp_core::{ClipRequest, RenderedClip, Result};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// One clip in a batch call, tagged so the caller can correlate results
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub id: String,
    pub request: ClipRequest,
}

/// Per-item outcome, in the same order the items were submitted
pub struct BatchItemOutcome {
    pub id: String,
    pub outcome: Result<(Arc<RenderedClip>, bool)>,
}

/// Aggregate result of a batch call
pub struct BatchOutcome {
    pub results: Vec<BatchItemOutcome>,
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Render every item, at most `max_concurrency` in flight at once.
///
/// The effective ceiling is `min(items.len(), max_concurrency, pool workers)`;
/// the pool's fixed worker count is the hard bound on CPU use either way.
pub async fn run_batch(
    pool: &RenderPool,
    items: Vec<BatchItem>,
    max_concurrency: usize,
) -> BatchOutcome {
    let submitted = items.len();
    let limit = submitted
        .min(max_concurrency.max(1))
        .min(pool.worker_count())
        .max(1);
    let started = Instant::now();

    // buffered() preserves submission order while letting up to `limit`
    // renders overlap
    let results: Vec<BatchItemOutcome> = stream::iter(items)
        .map(|item| async move {
            let outcome = pool.render(item.request).await;
            BatchItemOutcome {
                id: item.id,
                outcome,
            }
        })
        .buffered(limit)
        .collect()
        .await;

    let succeeded = results.iter().filter(|r| r.outcome.is_ok()).count();
    let failed = submitted - succeeded;
    let elapsed = started.elapsed();

    info!(
        "Batch complete: {} submitted, {} succeeded, {} failed in {:.3}s",
        submitted,
        succeeded,
        failed,
        elapsed.as_secs_f64()
    );

    BatchOutcome {
        results,
        submitted,
        succeeded,
        failed,
        elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chirp_core::{ClipCache, Error, RenderSettings};
    use std::path::Path;

    fn write_tone_wav(path: &Path, sample_rate: u32, seconds: f64) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let count = (seconds * sample_rate as f64) as usize;
        for i in 0..count {
            let t = i as f64 / sample_rate as f64;
            let v = (2.0 * std::f64::consts::PI * 660.0 * t).sin();
            writer.write_sample((v * i16::MAX as f64 * 0.3) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn item(id: &str, path: &str, start: f64, end: f64) -> BatchItem {
        BatchItem {
            id: id.to_string(),
            request: ClipRequest {
                file_path: path.to_string(),
                start_time: start,
                end_time: end,
                settings: RenderSettings::default(),
            },
        }
    }

    #[tokio::test]
    async fn partial_failure_does_not_abort_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_tone_wav(&path, 22050, 3.0);
        let good = path.display().to_string();

        let pool = RenderPool::new(2, Arc::new(ClipCache::new(10)));
        let items = vec![
            item("a", &good, 0.0, 1.0),
            item("b", "/missing/file.wav", 0.0, 1.0),
            item("c", &good, 1.0, 2.0),
        ];

        let outcome = run_batch(&pool, items, 4).await;
        assert_eq!(outcome.submitted, 3);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);

        // Order matches input, independent of completion order
        assert_eq!(outcome.results[0].id, "a");
        assert_eq!(outcome.results[1].id, "b");
        assert_eq!(outcome.results[2].id, "c");
        assert!(outcome.results[0].outcome.is_ok());
        assert!(matches!(
            &outcome.results[1].outcome,
            Err(Error::NotFound(_))
        ));
        assert!(outcome.results[2].outcome.is_ok());
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let pool = RenderPool::new(1, Arc::new(ClipCache::new(10)));
        let outcome = run_batch(&pool, Vec::new(), 4).await;
        assert_eq!(outcome.submitted, 0);
        assert_eq!(outcome.succeeded, 0);
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn duplicate_items_share_cache_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_tone_wav(&path, 22050, 2.0);
        let good = path.display().to_string();

        let cache = Arc::new(ClipCache::new(10));
        let pool = RenderPool::new(1, Arc::clone(&cache));
        let items = vec![
            item("a", &good, 0.0, 1.0),
            item("b", &good, 0.0, 1.0),
        ];

        let outcome = run_batch(&pool, items, 1).await;
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(cache.len(), 1);

        // Second identical item was served from cache
        let (_, cached) = outcome.results[1].outcome.as_ref().unwrap();
        assert!(*cached);
    }
}
