//! Daemon assembly -- dependency wiring and lifecycle management.
//!
//! [`App`] is the central coordinator of `logwarden-daemon`. It
//! validates configuration, loads the rule engine (fatal when the
//! rules file is missing), wires storage/metrics/queue handles into
//! the ingest worker and the analyzer loop, and manages graceful
//! shutdown.
//!
//! # Execution contexts
//!
//! 1. Ingest worker -- drains the job queue and runs the ingest
//!    processor per payload.
//! 2. Analyzer loop -- exactly one per deployment; polls storage and
//!    drives rule matching, anomaly detection, and notification.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use logwarden_core::config::LogwardenConfig;
use logwarden_core::notify::TracingChannel;
use logwarden_core::queue::{IngestJob, MemoryQueue};
use logwarden_core::stats::MemoryMetricsStore;
use logwarden_core::storage::MemoryStorage;
use logwarden_pipeline::anomaly::AnomalyDetector;
use logwarden_pipeline::config::PipelineConfig;
use logwarden_pipeline::{AnalyzerLoop, IngestProcessor, Notifier, RuleEngine};

/// The assembled daemon.
pub struct App {
    pipeline_config: PipelineConfig,
    storage: Arc<MemoryStorage>,
    metrics: Arc<MemoryMetricsStore>,
    engine: Arc<RuleEngine>,
    queue: MemoryQueue,
    job_rx: mpsc::Receiver<IngestJob>,
    shutdown: CancellationToken,
}

impl App {
    /// Validate configuration and assemble all components.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails or the
    /// rules file cannot be loaded. A daemon without rules is a
    /// configuration error, not a degraded mode.
    pub async fn build(config: LogwardenConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        let pipeline_config = PipelineConfig::from_core(&config);
        pipeline_config
            .validate()
            .map_err(|e| anyhow::anyhow!("pipeline config validation failed: {}", e))?;

        logwarden_core::metrics::describe_all();

        let engine = Arc::new(
            RuleEngine::load(&pipeline_config.rules_path)
                .await
                .map_err(|e| anyhow::anyhow!("failed to load rules: {}", e))?,
        );
        tracing::info!(
            rules = engine.rule_count(),
            path = %pipeline_config.rules_path,
            "rule engine ready"
        );

        let (queue, job_rx) = MemoryQueue::channel(config.ingest.queue_capacity);

        Ok(Self {
            pipeline_config,
            storage: Arc::new(MemoryStorage::new()),
            metrics: Arc::new(MemoryMetricsStore::new()),
            engine,
            queue,
            job_rx,
            shutdown: CancellationToken::new(),
        })
    }

    /// A queue handle for producers (API surface, tests).
    pub fn queue(&self) -> MemoryQueue {
        self.queue.clone()
    }

    /// The shared event store.
    pub fn storage(&self) -> Arc<MemoryStorage> {
        Arc::clone(&self.storage)
    }

    /// A token that stops both execution contexts when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the ingest worker and the analyzer loop until the
    /// shutdown token is cancelled.
    pub async fn run(self) -> Result<()> {
        let Self {
            pipeline_config,
            storage,
            metrics,
            engine,
            queue,
            job_rx,
            shutdown,
        } = self;
        // Hold a queue handle so the worker outlives idle periods;
        // it exits on shutdown, not on queue closure.
        let _queue = queue;

        let ingest = spawn_ingest_worker(
            IngestProcessor::new(storage.clone(), metrics.clone()),
            job_rx,
            shutdown.clone(),
        );

        let notifier = Notifier::new(
            storage.clone(),
            Arc::new(TracingChannel::new()),
            pipeline_config.recipients.clone(),
        );
        let detector = AnomalyDetector::new(
            pipeline_config.anomaly_window_min,
            pipeline_config.anomaly_threshold,
        );
        let mut analyzer = AnalyzerLoop::new(
            storage,
            metrics,
            engine,
            detector,
            notifier,
            Duration::from_secs(pipeline_config.poll_interval_secs),
            pipeline_config.alert_min_level,
        );

        let analyzer_shutdown = shutdown.clone();
        let analyzer_handle: JoinHandle<Result<()>> = tokio::spawn(async move {
            analyzer
                .run(analyzer_shutdown)
                .await
                .map_err(|e| anyhow::anyhow!("analyzer loop failed: {}", e))
        });

        // A fatal analyzer error terminates the daemon; supervised
        // restart is an operator concern.
        let result = analyzer_handle
            .await
            .map_err(|e| anyhow::anyhow!("analyzer task panicked: {}", e))?;

        shutdown.cancel();
        if let Err(e) = ingest.await {
            tracing::error!(error = %e, "ingest worker did not stop cleanly");
        }
        result
    }
}

/// Spawn the worker that drains the ingest queue.
///
/// Ingest failures are logged per job and never stop the worker;
/// the worker exits when the queue closes or shutdown is signalled.
fn spawn_ingest_worker(
    processor: IngestProcessor,
    mut job_rx: mpsc::Receiver<IngestJob>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                job = job_rx.recv() => {
                    let Some(job) = job else { break };
                    match processor.process(&job.source, &job.content).await {
                        Ok(outcome) => {
                            tracing::debug!(
                                source = %job.source,
                                stored = outcome.stored,
                                format = %outcome.format,
                                "ingest job processed"
                            );
                        }
                        Err(e) => {
                            tracing::error!(
                                source = %job.source,
                                error = %e,
                                "ingest job failed"
                            );
                        }
                    }
                }
            }
        }
        tracing::info!("ingest worker stopped");
    })
}
