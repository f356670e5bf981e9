//! PatternExtractor - Background job that mines action history into the
//! published failure pattern snapshot.
//!
//! Each cycle:
//! 1. Copies the action history (the ring lock is held only for the copy)
//! 2. Mines candidates and merges them with the current snapshot on a
//!    blocking thread, touching no shared state
//! 3. Publishes the merged snapshot with one pointer swap
//!
//! A failed cycle leaves the previous snapshot published.
//!
//! ## Graceful Shutdown
//!
//! `run` listens on a watch channel and returns as soon as shutdown is
//! signalled; a cycle already mining finishes first.

use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::config::PfpConfig;
use crate::domain::foundation::Timestamp;
use crate::domain::patterns::{
    extract_candidates, merge_patterns, PatternExtractionError, PatternSnapshot,
};
use crate::ports::{ActionHistoryStore, PatternStore};

/// PFP settings shared between the extractor, the assessor and the admin
/// surface. Replaced whole on every accepted update.
pub type SharedPfpConfig = Arc<ArcSwap<PfpConfig>>;

/// Outcome of one successful extraction cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionSummary {
    pub generation: u64,
    pub patterns: usize,
    pub candidates: usize,
    pub records_scanned: usize,
    pub records_skipped: usize,
    pub duration_ms: f64,
}

/// Running totals for operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractorStatus {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub last_error: Option<String>,
    pub last_generation: u64,
    pub last_pattern_count: usize,
    /// Unusable history records seen across all cycles.
    pub skipped_records: u64,
    pub last_run_at: Option<Timestamp>,
    pub last_duration_ms: Option<f64>,
}

/// Mines `ActionHistoryStore` into `PatternStore`.
pub struct PatternExtractor {
    history: Arc<dyn ActionHistoryStore>,
    store: Arc<dyn PatternStore>,
    config: SharedPfpConfig,
    // Serializes writers only. Readers go through `PatternStore::current`.
    writer: tokio::sync::Mutex<()>,
    status: Mutex<ExtractorStatus>,
}

impl PatternExtractor {
    pub fn new(
        history: Arc<dyn ActionHistoryStore>,
        store: Arc<dyn PatternStore>,
        config: SharedPfpConfig,
    ) -> Self {
        Self {
            history,
            store,
            config,
            writer: tokio::sync::Mutex::new(()),
            status: Mutex::new(ExtractorStatus::default()),
        }
    }

    pub fn status(&self) -> ExtractorStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn store(&self) -> &Arc<dyn PatternStore> {
        &self.store
    }

    /// Runs one extraction cycle now.
    ///
    /// # Errors
    ///
    /// Returns `PatternExtractionError` if mining fails; the previously
    /// published snapshot is kept.
    pub async fn force_extract(&self) -> Result<ExtractionSummary, PatternExtractionError> {
        let _writer = self.writer.lock().await;
        let started = Instant::now();

        let config = self.config.load_full();
        let params = config.extraction_params();
        let decay = config.decay_params();
        let records = self.history.snapshot();
        let previous = self.store.current();
        let records_scanned = records.len();

        let mined = tokio::task::spawn_blocking(move || {
            let scan = extract_candidates(&records, &params)?;
            let count = scan.candidates.len();
            Ok::<_, PatternExtractionError>((
                merge_patterns(&previous, scan.candidates, decay, Timestamp::now()),
                count,
                scan.skipped_records,
            ))
        })
        .await
        .map_err(|e| PatternExtractionError::Aborted(e.to_string()))
        .and_then(|r| r);

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        let (snapshot, candidates, records_skipped) = match mined {
            Ok(mined) => mined,
            Err(e) => {
                tracing::error!(error = %e, records = records_scanned, "Pattern extraction failed");
                let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
                status.cycles += 1;
                status.failed_cycles += 1;
                status.last_error = Some(e.to_string());
                status.last_run_at = Some(Timestamp::now());
                status.last_duration_ms = Some(duration_ms);
                return Err(e);
            }
        };

        let summary = ExtractionSummary {
            generation: snapshot.generation(),
            patterns: snapshot.len(),
            candidates,
            records_scanned,
            records_skipped,
            duration_ms,
        };
        if records_skipped > 0 {
            tracing::warn!(
                skipped = records_skipped,
                generation = summary.generation,
                "Skipped history records with non-finite context depth"
            );
        }
        self.publish(snapshot);

        {
            let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
            status.cycles += 1;
            status.last_error = None;
            status.last_generation = summary.generation;
            status.last_pattern_count = summary.patterns;
            status.skipped_records += records_skipped as u64;
            status.last_run_at = Some(Timestamp::now());
            status.last_duration_ms = Some(duration_ms);
        }

        tracing::info!(
            generation = summary.generation,
            patterns = summary.patterns,
            candidates = summary.candidates,
            records = summary.records_scanned,
            duration_ms = summary.duration_ms,
            "Pattern extraction completed"
        );
        Ok(summary)
    }

    fn publish(&self, snapshot: PatternSnapshot) {
        let previous = self.store.publish(snapshot);
        tracing::debug!(superseded = previous.generation(), "Pattern snapshot superseded");
    }

    /// Extracts on a timer until shutdown is signalled.
    ///
    /// The interval and `enabled` flag are re-read every cycle so runtime
    /// config updates apply without a restart.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Pattern extractor started");
        loop {
            let interval = self.interval();
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(interval) => {
                    if !self.config.load().enabled {
                        continue;
                    }
                    // Errors are recorded in status and logged.
                    let _ = self.force_extract().await;
                }
            }
        }
        tracing::info!("Pattern extractor stopped");
    }

    fn interval(&self) -> Duration {
        self.config.load().extraction_interval()
    }
}
