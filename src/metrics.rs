// Operation metrics module
//
// Lightweight counters for the file operations performed during a session

use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide metrics, logged on shutdown.
pub static METRICS: LazyLock<Metrics> = LazyLock::new(Metrics::new);

/// Session metrics
///
/// Uses atomic operations so the counters can be bumped from any service
/// without threading a handle through every call.
#[derive(Debug)]
pub struct Metrics {
    /// Files moved to a new extension
    pub files_renamed: AtomicU64,

    /// Files copied over their destination
    pub files_copied: AtomicU64,

    /// Copies skipped because the destination already had identical content
    pub copies_unchanged: AtomicU64,

    /// Files deleted
    pub files_deleted: AtomicU64,

    /// Patch files written
    pub patches_written: AtomicU64,

    /// Archive indices skipped during patch generation
    pub patches_skipped: AtomicU64,

    /// Searches run
    pub searches: AtomicU64,

    /// Operations that returned an error to the caller
    pub operations_failed: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            files_renamed: AtomicU64::new(0),
            files_copied: AtomicU64::new(0),
            copies_unchanged: AtomicU64::new(0),
            files_deleted: AtomicU64::new(0),
            patches_written: AtomicU64::new(0),
            patches_skipped: AtomicU64::new(0),
            searches: AtomicU64::new(0),
            operations_failed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_rename(&self) {
        self.files_renamed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_copy(&self) {
        self.files_copied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_copy_unchanged(&self) {
        self.copies_unchanged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.files_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_patch_written(&self) {
        self.patches_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_patch_skipped(&self) {
        self.patches_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_operation_failed(&self) {
        self.operations_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Total number of writes (renames, copies, deletes) performed
    pub fn total_writes(&self) -> u64 {
        self.files_renamed.load(Ordering::Relaxed)
            + self.files_copied.load(Ordering::Relaxed)
            + self.files_deleted.load(Ordering::Relaxed)
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Session Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Files: {} renamed, {} copied, {} unchanged, {} deleted ({} writes)",
            self.files_renamed.load(Ordering::Relaxed),
            self.files_copied.load(Ordering::Relaxed),
            self.copies_unchanged.load(Ordering::Relaxed),
            self.files_deleted.load(Ordering::Relaxed),
            self.total_writes()
        );
        tracing::info!(
            "Patches: {} written, {} skipped",
            self.patches_written.load(Ordering::Relaxed),
            self.patches_skipped.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Searches: {}, failed operations: {}",
            self.searches.load(Ordering::Relaxed),
            self.operations_failed.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.files_copied.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.total_writes(), 0);
    }

    #[test]
    fn test_record_file_operations() {
        let metrics = Metrics::new();

        metrics.record_rename();
        metrics.record_copy();
        metrics.record_copy();
        metrics.record_delete();
        metrics.record_copy_unchanged();

        assert_eq!(metrics.files_copied.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.copies_unchanged.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.total_writes(), 4);
    }

    #[test]
    fn test_patch_and_search_counters() {
        let metrics = Metrics::new();

        metrics.record_patch_written();
        metrics.record_patch_skipped();
        metrics.record_patch_skipped();
        metrics.record_search();
        metrics.record_operation_failed();

        assert_eq!(metrics.patches_written.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.patches_skipped.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.searches.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.operations_failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_uptime() {
        let metrics = Metrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }
}
