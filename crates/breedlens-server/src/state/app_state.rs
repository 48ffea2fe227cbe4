use crate::config::{GateMode, ServerConfig};
use breedlens_core::{Credential, GateDecision};
use breedlens_inference::{
    EndpointCache, FaceRegionGate, Gate, HostedBreedClassifier, WatchlistGate,
};
use breedlens_pipeline::{ClassificationPipeline, PipelineRun, PipelineState, PredictionReport};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// One completed pipeline run, kept in memory for inspection and export
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationRecord {
    /// Record id, used in the records API
    pub id: String,

    /// Uploaded file name
    pub file_name: String,

    /// Terminal pipeline state
    pub state: PipelineState,

    /// User-visible banner message
    pub message: String,

    /// Formatted top-N table (empty when suppressed or failed)
    pub report: PredictionReport,

    /// Gate decision, when a gate was consulted
    pub gate_decision: Option<GateDecision>,

    /// Pipeline wall-clock latency
    pub latency_ms: u64,

    /// When the upload was processed
    pub created_at: DateTime<Utc>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Server configuration, fixed after startup
    pub config: Arc<ServerConfig>,

    /// The classification pipeline, constructed once and injected here
    pub pipeline: Arc<ClassificationPipeline>,

    /// Whether a credential was resolved at startup
    pub credential_present: bool,

    /// Bounded history of processed uploads, newest first
    records: Arc<RwLock<VecDeque<ClassificationRecord>>>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        pipeline: ClassificationPipeline,
        credential_present: bool,
    ) -> Self {
        let capacity = config.history_capacity;
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            credential_present,
            records: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
        }
    }

    /// Turn a finished pipeline run into a stored record
    pub fn record_run(&self, file_name: &str, run: PipelineRun) -> ClassificationRecord {
        let record = ClassificationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            state: run.state(),
            message: run.message,
            report: run.report,
            gate_decision: run.gate_decision,
            latency_ms: run.latency_ms,
            created_at: Utc::now(),
        };
        self.add_record(record.clone());
        record
    }

    /// Add a record to history, evicting the oldest beyond capacity
    pub fn add_record(&self, record: ClassificationRecord) {
        let mut records = self.records.write();
        records.push_front(record);
        if records.len() > self.config.history_capacity {
            records.pop_back();
        }
    }

    /// Get a record by id
    pub fn get_record(&self, id: &str) -> Option<ClassificationRecord> {
        let records = self.records.read();
        records.iter().find(|r| r.id == id).cloned()
    }

    /// Get recent records, newest first
    pub fn recent_records(&self, limit: usize) -> Vec<ClassificationRecord> {
        let records = self.records.read();
        records.iter().take(limit).cloned().collect()
    }
}

/// Build the classification pipeline from configuration.
///
/// The endpoint cache and credential are resolved once at startup and
/// injected; request handlers never construct model handles themselves.
pub fn build_pipeline(
    config: &ServerConfig,
    credential: Option<&Credential>,
) -> breedlens_core::Result<ClassificationPipeline> {
    let cache = EndpointCache::with_base_url(&config.inference_base_url);

    let classifier = HostedBreedClassifier::new(&cache, &config.primary_model, credential)?;
    let mut pipeline = ClassificationPipeline::new(Arc::new(classifier), credential.is_some())
        .with_top_n(config.top_n)
        .with_call_timeout(Duration::from_secs(config.timeout_secs));

    // Gates need a credential for their own hosted calls; without one the
    // pipeline already blocks before the gate would run.
    if let Some(credential) = credential {
        let gate: Option<Arc<dyn Gate>> = match config.gate {
            GateMode::Off => None,
            GateMode::Watchlist => {
                let watchlist: Vec<&str> = config.watchlist.iter().map(String::as_str).collect();
                Some(Arc::new(WatchlistGate::with_watchlist(
                    &cache,
                    &config.detector_model,
                    credential,
                    &watchlist,
                )?))
            }
            GateMode::Face => Some(Arc::new(FaceRegionGate::new(
                &cache,
                &config.detector_model,
                credential,
            )?)),
        };

        if let Some(gate) = gate {
            tracing::info!(gate = gate.name(), "gate enabled");
            pipeline = pipeline.with_gate(gate);
        }
    } else if config.gate != GateMode::Off {
        tracing::warn!("gate configured but no credential resolved; uploads will be blocked");
    }

    Ok(pipeline)
}
