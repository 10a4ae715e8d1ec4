//! Async driver: an ingestion task feeding the rotator, an interval ticker
//! closing windows, and a shutdown path that drains the last window.

use super::processor::{Stage, WindowOutcome, WindowProcessor};
use crate::collectors::{CaptureSource, ObservationAdapter};
use crate::config::{IdsConfig, Mode};
use crate::error::{IdsError, Result};
use crate::features::{FeatureDeriver, RollingHistory, WindowRotator};
use crate::labeling::LabelAssigner;
use crate::model::load_classifier;
use crate::queue;
use crate::storage::{AlertSink, AlertStore, DatasetWriter};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub windows_closed: u64,
    pub windows_empty: u64,
    pub rows_written: u64,
    pub alerts_emitted: u64,
    pub attacks: u64,
    pub classify_failures: u64,
    pub sink_failures: u64,
    pub records_accepted: u64,
    pub records_discarded: u64,
    /// The capture source closed on its own (as opposed to a shutdown request).
    pub capture_ended: bool,
}

impl RunSummary {
    fn observe(&mut self, outcome: &WindowOutcome) {
        match outcome {
            WindowOutcome::Labeled { .. } => self.rows_written += 1,
            WindowOutcome::Classified(result) => {
                self.alerts_emitted += 1;
                if result.label.is_attack() {
                    self.attacks += 1;
                }
            }
            WindowOutcome::Unclassified { .. } => self.classify_failures += 1,
        }
    }

    /// A detector that loses its capture stops monitoring, which is an error.
    pub fn into_result(self, mode: Mode) -> Result<Self> {
        if self.capture_ended && mode == Mode::Detect {
            return Err(IdsError::CaptureEnded);
        }
        Ok(self)
    }
}

pub struct Pipeline {
    mode: Mode,
    adapter: Arc<ObservationAdapter>,
    rotator: Arc<WindowRotator>,
    processor: Arc<Mutex<WindowProcessor>>,
    interval: Duration,
    grace: Duration,
}

impl Pipeline {
    pub fn new(
        mode: Mode,
        adapter: ObservationAdapter,
        rotator: WindowRotator,
        processor: WindowProcessor,
        interval: Duration,
        grace: Duration,
    ) -> Self {
        Self {
            mode,
            adapter: Arc::new(adapter),
            rotator: Arc::new(rotator),
            processor: Arc::new(Mutex::new(processor)),
            interval,
            grace,
        }
    }

    /// Wire every stage from configuration. Fails if the dataset, model
    /// or journal cannot be opened.
    pub fn from_config(config: &IdsConfig) -> Result<Self> {
        let adapter = ObservationAdapter::new(config.capture_layout());
        let (rotator, stage) = match config.mode {
            Mode::Collect => {
                let dataset = DatasetWriter::open(&config.sink.dataset_path)?;
                info!(path = %dataset.path().display(), "dataset opened");
                let stage = Stage::Collect {
                    labeler: LabelAssigner::new(config.labeling.attack_byte_share),
                    dataset,
                };
                (WindowRotator::new(config.labeling.attacker_addrs.iter().copied()), stage)
            }
            Mode::Detect => {
                let classifier = load_classifier(&config.model.path)?;
                let mut alerts = AlertSink::stdout(config.sink.alert_format);
                if config.sink.alert_journal {
                    let store = AlertStore::open(&config.journal_path())?;
                    let pruned = store.apply_retention(config.sink.journal_retention_days, Utc::now())?;
                    info!(path = %config.journal_path().display(), pruned, "alert journal opened");
                    alerts = alerts.with_journal(store);
                }
                (WindowRotator::new(std::iter::empty()), Stage::Detect { classifier, alerts })
            }
        };
        let processor = WindowProcessor::new(
            FeatureDeriver::new(config.window.interval_secs),
            RollingHistory::new(config.window.history_capacity),
            stage,
            queue::source_from_config(&config.queue),
        );
        Ok(Self::new(
            config.mode,
            adapter,
            rotator,
            processor,
            config.window.interval(),
            config.window.shutdown_grace(),
        ))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Run until the capture ends or `shutdown` flips to true (or its sender
    /// is dropped). The window open at that moment is processed before
    /// returning, bounded by the grace period.
    pub async fn run(self, source: CaptureSource, mut shutdown: watch::Receiver<bool>) -> Result<RunSummary> {
        info!(
            mode = ?self.mode,
            source = source.name(),
            interval_ms = self.interval.as_millis() as u64,
            "pipeline started"
        );
        let mut ingest = tokio::spawn(ingest(source, self.adapter.clone(), self.rotator.clone()));

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut summary = RunSummary::default();
        if *shutdown.borrow() {
            ingest.abort();
        } else {
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.close_window(&mut summary).await;
                    }
                    joined = &mut ingest => {
                        match joined {
                            Ok(Ok(())) => info!("capture ended"),
                            Ok(Err(e)) => warn!(error = %e, "capture failed"),
                            Err(e) => warn!(error = %e, "ingestion task failed"),
                        }
                        summary.capture_ended = true;
                        break;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("shutdown requested");
                            ingest.abort();
                            break;
                        }
                    }
                }
            }
        }
        if !summary.capture_ended {
            // Wait for the abort so no record lands after the final rotation.
            let _ = (&mut ingest).await;
        }

        if tokio::time::timeout(self.grace, self.close_window(&mut summary))
            .await
            .is_err()
        {
            warn!(grace_ms = self.grace.as_millis() as u64, "final window not processed in time");
        }

        summary.records_accepted = self.adapter.accepted();
        summary.records_discarded = self.adapter.discarded();
        info!(
            windows = summary.windows_closed,
            empty = summary.windows_empty,
            rows = summary.rows_written,
            alerts = summary.alerts_emitted,
            attacks = summary.attacks,
            classify_failures = summary.classify_failures,
            sink_failures = summary.sink_failures,
            accepted = summary.records_accepted,
            discarded = summary.records_discarded,
            "pipeline stopped"
        );
        Ok(summary)
    }

    /// Run on a dedicated multi-thread runtime and tear it down within the
    /// grace period, so work still running on the blocking pool cannot hold
    /// the process past it. `open_source` runs inside the runtime.
    pub fn run_blocking<F>(self, open_source: F, shutdown: watch::Receiver<bool>) -> Result<RunSummary>
    where
        F: FnOnce() -> Result<CaptureSource>,
    {
        let grace = self.grace;
        let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        let result = rt.block_on(async move {
            let source = open_source()?;
            self.run(source, shutdown).await
        });
        rt.shutdown_timeout(grace);
        result
    }

    async fn close_window(&self, summary: &mut RunSummary) {
        let snapshot = self.rotator.rotate();
        summary.windows_closed += 1;
        if snapshot.is_empty() {
            summary.windows_empty += 1;
            debug!("empty window skipped");
            return;
        }
        debug!(
            packets = snapshot.packet_count,
            discarded = self.adapter.discarded(),
            "window closed"
        );

        let processor = self.processor.clone();
        let joined = tokio::task::spawn_blocking(move || processor.lock().process(&snapshot)).await;
        match joined {
            Ok(Ok(Some(outcome))) => summary.observe(&outcome),
            Ok(Ok(None)) => summary.windows_empty += 1,
            Ok(Err(e)) => {
                summary.sink_failures += 1;
                warn!(error = %e, "window output lost");
            }
            Err(e) => {
                summary.sink_failures += 1;
                warn!(error = %e, "window processing task failed");
            }
        }
    }
}

async fn ingest(
    mut source: CaptureSource,
    adapter: Arc<ObservationAdapter>,
    rotator: Arc<WindowRotator>,
) -> Result<()> {
    while let Some(record) = source.next_record().await? {
        if let Some(obs) = adapter.adapt_bytes(record) {
            rotator.record(&obs);
        }
    }
    Ok(())
}
