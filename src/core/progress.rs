use futures::stream::{self, Stream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Where upload progress snapshots are published. Receivers may come and go.
pub type ProgressSink = watch::Sender<UploadProgress>;

pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
    pub elapsed: Duration,
}

impl UploadProgress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let ratio = self.loaded as f64 / self.total as f64;
        (ratio * 100.0).round().min(100.0) as u8
    }

    pub fn bytes_per_second(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0).then(|| self.loaded as f64 / secs)
    }

    /// Estimated time left, only when it is finite and positive.
    pub fn remaining(&self) -> Option<Duration> {
        let speed = self.bytes_per_second()?;
        let remaining = self.total.saturating_sub(self.loaded) as f64 / speed;
        (remaining.is_finite() && remaining > 0.0).then(|| Duration::from_secs_f64(remaining))
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.loaded >= self.total
    }
}

/// Counts bytes as the HTTP client pulls attachment chunks and publishes snapshots.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    sink: ProgressSink,
    loaded: Arc<AtomicU64>,
    total: u64,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(sink: ProgressSink, total: u64) -> Self {
        let tracker = Self {
            sink,
            loaded: Arc::new(AtomicU64::new(0)),
            total,
            started: Instant::now(),
        };
        tracker.publish(0);
        tracker
    }

    pub fn advance(&self, bytes: usize) {
        let loaded = self.loaded.fetch_add(bytes as u64, Ordering::SeqCst) + bytes as u64;
        self.publish(loaded);
    }

    fn publish(&self, loaded: u64) {
        self.sink.send_replace(UploadProgress {
            loaded,
            total: self.total,
            elapsed: self.started.elapsed(),
        });
    }

    /// Splits `data` into chunks that report themselves when consumed.
    pub fn track(
        &self,
        data: Vec<u8>,
        chunk_size: usize,
    ) -> impl Stream<Item = std::io::Result<Vec<u8>>> + Send + 'static {
        let tracker = self.clone();
        let chunks: Vec<Vec<u8>> = data.chunks(chunk_size.max(1)).map(<[u8]>::to_vec).collect();
        stream::iter(chunks).map(move |chunk| {
            tracker.advance(chunk.len());
            Ok(chunk)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_percent_speed_and_remaining() {
        let progress = UploadProgress {
            loaded: 512 * 1024,
            total: 1024 * 1024,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(progress.percent(), 50);
        assert_eq!(progress.bytes_per_second(), Some(262_144.0));
        assert_eq!(progress.remaining(), Some(Duration::from_secs(2)));
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_edge_values() {
        let empty = UploadProgress::default();
        assert_eq!(empty.percent(), 0);
        assert_eq!(empty.bytes_per_second(), None);
        assert_eq!(empty.remaining(), None);

        let done = UploadProgress {
            loaded: 10,
            total: 10,
            elapsed: Duration::from_millis(100),
        };
        assert_eq!(done.percent(), 100);
        assert_eq!(done.remaining(), None);
        assert!(done.is_complete());
    }

    #[test]
    fn test_tracked_stream_reports_every_chunk() {
        let (tx, rx) = watch::channel(UploadProgress::default());
        let tracker = ProgressTracker::new(tx, 10);

        let chunks: Vec<Vec<u8>> = tokio_test::block_on(
            tracker
                .track(vec![7u8; 10], 4)
                .map(|chunk| chunk.unwrap())
                .collect(),
        );

        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![4, 4, 2]);
        let last = *rx.borrow();
        assert_eq!(last.loaded, 10);
        assert_eq!(last.total, 10);
        assert!(last.is_complete());
    }
}
