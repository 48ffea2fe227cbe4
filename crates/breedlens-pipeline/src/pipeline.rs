//! End-to-end gated classification pipeline
//!
//! Drives one uploaded image through decode → gate → classify → format,
//! strictly sequentially. Every external call is wrapped in a timeout.
//! Errors are terminal for the image and surface as a user-visible message;
//! they never escape as panics and never leave partial results behind.

use crate::format::{PredictionReport, DEFAULT_TOP_N};
use crate::state::{PipelineState, StateTrace};
use breedlens_core::{DecodedImage, Error, GateDecision};
use breedlens_inference::{BreedClassifier, Gate};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default budget for each external inference call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// The gated classification pipeline.
///
/// Constructed once at process start with its collaborators injected;
/// each `process` call is an isolated, re-entrant run for one image.
pub struct ClassificationPipeline {
    classifier: Arc<dyn BreedClassifier>,
    gate: Option<Arc<dyn Gate>>,
    credential_present: bool,
    top_n: usize,
    call_timeout: Duration,
}

/// Outcome of one image's pipeline run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// States visited, in order
    pub trace: StateTrace,

    /// User-visible banner message
    pub message: String,

    /// Formatted top-N table; empty when suppressed or failed
    pub report: PredictionReport,

    /// Gate decision, when a gate was consulted
    pub gate_decision: Option<GateDecision>,

    /// Wall-clock duration of the run in milliseconds
    pub latency_ms: u64,
}

impl PipelineRun {
    /// Terminal state of the run
    pub fn state(&self) -> PipelineState {
        self.trace.current()
    }

    /// Whether the run produced displayable predictions
    pub fn succeeded(&self) -> bool {
        self.state() == PipelineState::Displayed
    }
}

impl ClassificationPipeline {
    /// Create a pipeline around the primary classifier.
    ///
    /// `credential_present` is checked before anything else on every run;
    /// a missing credential blocks the whole pipeline with zero inference
    /// calls, gate included.
    pub fn new(classifier: Arc<dyn BreedClassifier>, credential_present: bool) -> Self {
        Self {
            classifier,
            gate: None,
            credential_present,
            top_n: DEFAULT_TOP_N,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Install a gate; without one, uploads go straight to classification
    pub fn with_gate(mut self, gate: Arc<dyn Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Override how many predictions are displayed
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Override the per-call timeout
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Run the full pipeline over one uploaded image.
    pub async fn process(&self, upload: Vec<u8>) -> PipelineRun {
        let start = Instant::now();
        let mut trace = StateTrace::new();

        if !self.credential_present {
            trace.push(PipelineState::Failed);
            return PipelineRun {
                trace,
                message: "No inference credential available. Provide a Hugging Face token \
                          (set HF_TOKEN) and try again."
                    .to_string(),
                report: PredictionReport::empty(),
                gate_decision: None,
                latency_ms: start.elapsed().as_millis() as u64,
            };
        }

        let image = match DecodedImage::decode(upload) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(error = %e, "rejected upload");
                trace.push(PipelineState::Failed);
                return PipelineRun {
                    trace,
                    message: format!("Upload rejected: {e}"),
                    report: PredictionReport::empty(),
                    gate_decision: None,
                    latency_ms: start.elapsed().as_millis() as u64,
                };
            }
        };

        trace.push(PipelineState::ImageReceived);
        tracing::debug!(image = ?image, "upload decoded");

        let gate_decision = match &self.gate {
            Some(gate) => {
                trace.push(PipelineState::GateEvaluating);
                Some(self.evaluate_gate(gate.as_ref(), &image).await)
            }
            None => None,
        };

        if let Some(GateDecision::Suppress { reason }) = &gate_decision {
            trace.push(PipelineState::Suppressed);
            return PipelineRun {
                trace,
                message: format!("Classification skipped: {reason}."),
                report: PredictionReport::empty(),
                gate_decision,
                latency_ms: start.elapsed().as_millis() as u64,
            };
        }

        trace.push(PipelineState::Classifying);
        let predictions = tokio::time::timeout(self.call_timeout, self.classifier.classify(&image))
            .await
            .map_err(|_| {
                Error::inference(format!(
                    "classifier {} timed out after {:?}",
                    self.classifier.name(),
                    self.call_timeout
                ))
            })
            .and_then(|r| r);

        let predictions = match predictions {
            Ok(predictions) => predictions,
            Err(e) => {
                tracing::warn!(error = %e, classifier = self.classifier.name(), "classification failed");
                trace.push(PipelineState::Failed);
                let message = match &e {
                    Error::MissingCredential => "No inference credential available. Provide a \
                                                 Hugging Face token (set HF_TOKEN) and try again."
                        .to_string(),
                    _ => format!("Classification failed: {e}"),
                };
                return PipelineRun {
                    trace,
                    message,
                    report: PredictionReport::empty(),
                    gate_decision,
                    latency_ms: start.elapsed().as_millis() as u64,
                };
            }
        };

        let report = PredictionReport::format(&predictions, self.top_n);
        trace.push(PipelineState::Formatted);
        trace.push(PipelineState::Displayed);

        PipelineRun {
            trace,
            message: "Prediction complete.".to_string(),
            report,
            gate_decision,
            latency_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Consult the gate, failing open on errors and timeouts.
    ///
    /// A broken or slow secondary model must not drop legitimate uploads,
    /// so every gate failure maps to `Proceed`.
    async fn evaluate_gate(&self, gate: &dyn Gate, image: &DecodedImage) -> GateDecision {
        match tokio::time::timeout(self.call_timeout, gate.evaluate(image)).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(e)) => {
                tracing::warn!(gate = gate.name(), error = %e, "gate failed; proceeding");
                GateDecision::Proceed
            }
            Err(_) => {
                tracing::warn!(gate = gate.name(), "gate timed out; proceeding");
                GateDecision::Proceed
            }
        }
    }
}
