//! End-to-end pipeline properties
//!
//! Exercises the gated flow with configurable mock gate/classifier
//! implementations, asserting the contracts the pipeline guarantees:
//! suppression and missing credentials produce zero classifier calls, gate
//! failures fail open, and every failure is terminal for the image.

use async_trait::async_trait;
use breedlens_core::{DecodedImage, Error, GateDecision, PredictionItem, Result};
use breedlens_inference::{BreedClassifier, Gate};
use breedlens_pipeline::{ClassificationPipeline, PipelineState, PredictionReport};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A configurable mock classifier with a call counter
struct MockBreedClassifier {
    predictions: Vec<PredictionItem>,
    failure: Option<String>,
    simulated_latency: Option<Duration>,
    call_count: AtomicU32,
}

impl MockBreedClassifier {
    fn new() -> Self {
        Self {
            predictions: vec![
                PredictionItem::new("golden retriever", 0.82),
                PredictionItem::new("Labrador retriever", 0.10),
                PredictionItem::new("kuvasz", 0.04),
                PredictionItem::new("Great Pyrenees", 0.02),
                PredictionItem::new("Samoyed", 0.01),
            ],
            failure: None,
            simulated_latency: None,
            call_count: AtomicU32::new(0),
        }
    }

    fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = Some(latency);
        self
    }

    fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BreedClassifier for MockBreedClassifier {
    async fn classify(&self, _image: &DecodedImage) -> Result<Vec<PredictionItem>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.simulated_latency {
            tokio::time::sleep(latency).await;
        }

        match &self.failure {
            Some(message) => Err(Error::inference(message)),
            None => Ok(self.predictions.clone()),
        }
    }

    fn name(&self) -> &str {
        "mock-classifier"
    }
}

/// A configurable mock gate with a call counter
struct MockGate {
    decision: GateDecision,
    failure: Option<String>,
    simulated_latency: Option<Duration>,
    call_count: AtomicU32,
}

impl MockGate {
    fn proceeding() -> Self {
        Self {
            decision: GateDecision::Proceed,
            failure: None,
            simulated_latency: None,
            call_count: AtomicU32::new(0),
        }
    }

    fn suppressing(reason: &str) -> Self {
        Self {
            decision: GateDecision::suppress(reason),
            ..Self::proceeding()
        }
    }

    fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = Some(latency);
        self
    }

    fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Gate for MockGate {
    async fn evaluate(&self, _image: &DecodedImage) -> Result<GateDecision> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.simulated_latency {
            tokio::time::sleep(latency).await;
        }

        match &self.failure {
            Some(message) => Err(Error::inference(message)),
            None => Ok(self.decision.clone()),
        }
    }

    fn name(&self) -> &str {
        "mock-gate"
    }
}

fn dog_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([180, 140, 90]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

#[tokio::test]
async fn suppressing_gate_prevents_any_classifier_call() {
    let classifier = Arc::new(MockBreedClassifier::new());
    let gate = Arc::new(MockGate::suppressing("detected \"person\" in the uploaded image"));

    let pipeline = ClassificationPipeline::new(classifier.clone(), true).with_gate(gate.clone());
    let run = pipeline.process(dog_jpeg()).await;

    assert_eq!(run.state(), PipelineState::Suppressed);
    assert_eq!(classifier.call_count(), 0);
    assert_eq!(gate.call_count(), 1);
    assert!(run.report.is_empty());
    assert!(run.message.contains("skipped"));

    // The export table for a suppressed run is empty as well.
    let csv = run.report.to_csv().unwrap();
    assert_eq!(csv.trim_end(), "Breed,Confidence (%)");
}

#[tokio::test]
async fn proceeding_gate_classifies_and_formats_top_three() {
    let classifier = Arc::new(MockBreedClassifier::new());
    let gate = Arc::new(MockGate::proceeding());

    let pipeline = ClassificationPipeline::new(classifier.clone(), true)
        .with_gate(gate.clone())
        .with_top_n(3);
    let run = pipeline.process(dog_jpeg()).await;

    assert_eq!(run.state(), PipelineState::Displayed);
    assert_eq!(gate.call_count(), 1);
    assert_eq!(classifier.call_count(), 1);
    assert_eq!(run.report.len(), 3);

    // Top row is the top-ranked breed; confidences are valid percentages.
    assert_eq!(run.report.rows()[0].label, "golden retriever");
    let sum: f32 = run.report.rows().iter().map(|r| r.confidence_pct).sum();
    assert!(sum <= 100.0);
    for row in run.report.rows() {
        assert!((0.0..=100.0).contains(&row.confidence_pct));
    }
}

#[tokio::test]
async fn missing_credential_blocks_pipeline_with_zero_inference_calls() {
    let classifier = Arc::new(MockBreedClassifier::new());
    let gate = Arc::new(MockGate::proceeding());

    let pipeline = ClassificationPipeline::new(classifier.clone(), false).with_gate(gate.clone());
    let run = pipeline.process(dog_jpeg()).await;

    assert_eq!(run.state(), PipelineState::Failed);
    assert_eq!(gate.call_count(), 0);
    assert_eq!(classifier.call_count(), 0);
    assert!(run.message.contains("HF_TOKEN"));
    assert!(run.report.is_empty());
}

#[tokio::test]
async fn failing_gate_fails_open() {
    let classifier = Arc::new(MockBreedClassifier::new());
    let gate = Arc::new(MockGate::proceeding().with_failure("quota exceeded"));

    let pipeline = ClassificationPipeline::new(classifier.clone(), true).with_gate(gate.clone());
    let run = pipeline.process(dog_jpeg()).await;

    assert_eq!(run.state(), PipelineState::Displayed);
    assert_eq!(classifier.call_count(), 1);
    assert_eq!(run.gate_decision, Some(GateDecision::Proceed));
}

#[tokio::test]
async fn slow_gate_fails_open() {
    let classifier = Arc::new(MockBreedClassifier::new());
    let gate = Arc::new(MockGate::proceeding().with_latency(Duration::from_millis(200)));

    let pipeline = ClassificationPipeline::new(classifier.clone(), true)
        .with_gate(gate.clone())
        .with_call_timeout(Duration::from_millis(20));
    let run = pipeline.process(dog_jpeg()).await;

    assert_eq!(run.state(), PipelineState::Displayed);
    assert_eq!(classifier.call_count(), 1);
}

#[tokio::test]
async fn failing_classifier_is_terminal_with_no_partial_results() {
    let classifier = Arc::new(MockBreedClassifier::new().with_failure("backend 503"));

    let pipeline = ClassificationPipeline::new(classifier.clone(), true);
    let run = pipeline.process(dog_jpeg()).await;

    assert_eq!(run.state(), PipelineState::Failed);
    assert!(run.message.contains("Classification failed"));
    assert!(run.report.is_empty());
}

#[tokio::test]
async fn slow_classifier_maps_to_inference_failure() {
    let classifier = Arc::new(MockBreedClassifier::new().with_latency(Duration::from_millis(200)));

    let pipeline = ClassificationPipeline::new(classifier.clone(), true)
        .with_call_timeout(Duration::from_millis(20));
    let run = pipeline.process(dog_jpeg()).await;

    assert_eq!(run.state(), PipelineState::Failed);
    assert!(run.message.contains("timed out"));
}

#[tokio::test]
async fn invalid_upload_is_rejected_before_any_inference() {
    let classifier = Arc::new(MockBreedClassifier::new());
    let gate = Arc::new(MockGate::proceeding());

    let pipeline = ClassificationPipeline::new(classifier.clone(), true).with_gate(gate.clone());
    let run = pipeline.process(b"not an image at all".to_vec()).await;

    assert_eq!(run.state(), PipelineState::Failed);
    assert_eq!(gate.call_count(), 0);
    assert_eq!(classifier.call_count(), 0);
    assert!(run.message.contains("Upload rejected"));
}

#[tokio::test]
async fn pipeline_without_gate_skips_gate_state() {
    let classifier = Arc::new(MockBreedClassifier::new());

    let pipeline = ClassificationPipeline::new(classifier.clone(), true);
    let run = pipeline.process(dog_jpeg()).await;

    assert_eq!(run.state(), PipelineState::Displayed);
    assert!(!run.trace.visited(PipelineState::GateEvaluating));
    assert!(run.trace.visited(PipelineState::Classifying));
    assert_eq!(run.gate_decision, None);
}

#[tokio::test]
async fn session_stays_usable_after_a_failed_run() {
    let failing = Arc::new(MockBreedClassifier::new().with_failure("backend down"));
    let pipeline = ClassificationPipeline::new(failing, true);
    let run = pipeline.process(dog_jpeg()).await;
    assert_eq!(run.state(), PipelineState::Failed);

    // A fresh run through the same pipeline object succeeds independently.
    let healthy = Arc::new(MockBreedClassifier::new());
    let pipeline = ClassificationPipeline::new(healthy.clone(), true);
    let run = pipeline.process(dog_jpeg()).await;
    assert_eq!(run.state(), PipelineState::Displayed);
    assert_eq!(healthy.call_count(), 1);
}

#[tokio::test]
async fn exported_table_round_trips_for_a_successful_run() {
    let classifier = Arc::new(MockBreedClassifier::new());
    let pipeline = ClassificationPipeline::new(classifier, true).with_top_n(3);
    let run = pipeline.process(dog_jpeg()).await;

    let exported = run.report.to_csv().unwrap();
    let parsed = PredictionReport::from_csv(&exported).unwrap();
    assert_eq!(parsed.rows(), run.report.rows());
}
