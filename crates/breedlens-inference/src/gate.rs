//! Inference gates
//!
//! A gate runs a secondary detection model over the uploaded image and
//! decides whether to suppress primary classification. Two implementations
//! exist: a label watchlist over a hosted classifier, and a geometric check
//! over a hosted face/person detector.
//!
//! Gates fail open: a gate that errors or reports nothing yields `Proceed`,
//! so a broken secondary model never silently drops legitimate uploads. The
//! pipeline enforces the same policy for gate transport errors.

use crate::endpoint::{EndpointCache, ModelEndpoint};
use aho_corasick::AhoCorasick;
use async_trait::async_trait;
use breedlens_core::{Credential, DecodedImage, Error, GateDecision, Result};
use serde::Deserialize;
use std::sync::Arc;

/// Default secondary human-detector model
pub const DEFAULT_DETECTOR_MODEL: &str = "facebook/detr-resnet-50";

/// Labels that suppress primary classification when matched
pub const DEFAULT_WATCHLIST: [&str; 2] = ["person", "human"];

/// Minimum detector confidence for a region to count
const MIN_REGION_CONFIDENCE: f32 = 0.5;

/// Trait for all gates
#[async_trait]
pub trait Gate: Send + Sync {
    /// Evaluate the image and decide whether to suppress classification
    async fn evaluate(&self, image: &DecodedImage) -> Result<GateDecision>;

    /// Get the gate name
    fn name(&self) -> &str;
}

/// Gate that matches the top-ranked label of a secondary classifier against
/// a case-insensitive substring watchlist.
pub struct WatchlistGate {
    name: String,
    endpoint: Arc<ModelEndpoint>,
    matcher: AhoCorasick,
}

impl WatchlistGate {
    /// Create a watchlist gate with the default watchlist
    pub fn new(cache: &EndpointCache, model_id: &str, credential: &Credential) -> Result<Self> {
        Self::with_watchlist(cache, model_id, credential, &DEFAULT_WATCHLIST)
    }

    /// Create a watchlist gate with a custom watchlist
    pub fn with_watchlist(
        cache: &EndpointCache,
        model_id: &str,
        credential: &Credential,
        watchlist: &[&str],
    ) -> Result<Self> {
        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(watchlist)
            .map_err(|e| Error::internal(format!("failed to build watchlist matcher: {e}")))?;

        Ok(Self {
            name: format!("watchlist:{model_id}"),
            endpoint: cache.endpoint(model_id, credential)?,
            matcher,
        })
    }

    fn matches(&self, label: &str) -> bool {
        self.matcher.is_match(label)
    }
}

#[async_trait]
impl Gate for WatchlistGate {
    async fn evaluate(&self, image: &DecodedImage) -> Result<GateDecision> {
        let payload = self.endpoint.infer_image(image).await?;

        // Only the top-ranked label decides; lower ranks are noise here.
        let top: Option<RawLabel> = serde_json::from_value::<Vec<RawLabel>>(payload)
            .map_err(|e| Error::inference(format!("gate model sent malformed labels: {e}")))?
            .into_iter()
            .next();

        match top {
            Some(top) if self.matches(&top.label) => {
                tracing::info!(label = %top.label, score = top.score, "gate matched watchlist");
                Ok(GateDecision::suppress(format!(
                    "detected {:?} in the uploaded image",
                    top.label
                )))
            }
            Some(_) => Ok(GateDecision::Proceed),
            // No results: fail open.
            None => Ok(GateDecision::Proceed),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Gate that suppresses when a hosted object detector reports at least one
/// face/person region above the confidence floor.
pub struct FaceRegionGate {
    name: String,
    endpoint: Arc<ModelEndpoint>,
    matcher: AhoCorasick,
}

impl FaceRegionGate {
    /// Create a face-region gate against the given detector model
    pub fn new(cache: &EndpointCache, model_id: &str, credential: &Credential) -> Result<Self> {
        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(["person", "face"])
            .map_err(|e| Error::internal(format!("failed to build region matcher: {e}")))?;

        Ok(Self {
            name: format!("face-region:{model_id}"),
            endpoint: cache.endpoint(model_id, credential)?,
            matcher,
        })
    }
}

#[async_trait]
impl Gate for FaceRegionGate {
    async fn evaluate(&self, image: &DecodedImage) -> Result<GateDecision> {
        let payload = self.endpoint.infer_image(image).await?;

        let regions: Vec<DetectedRegion> = serde_json::from_value(payload)
            .map_err(|e| Error::inference(format!("detector sent malformed regions: {e}")))?;

        let hit = regions
            .iter()
            .find(|r| r.score >= MIN_REGION_CONFIDENCE && self.matcher.is_match(&r.label));

        match hit {
            Some(region) => {
                tracing::info!(
                    label = %region.label,
                    score = region.score,
                    "detector reported a face region"
                );
                Ok(GateDecision::suppress("detected a person in the uploaded image"))
            }
            None => Ok(GateDecision::Proceed),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// Hosted API response structures
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawLabel {
    label: String,
    #[serde(default)]
    score: f32,
}

/// One detection with bounding box and confidence
#[derive(Debug, Deserialize)]
struct DetectedRegion {
    label: String,
    score: f32,
    #[allow(dead_code)]
    #[serde(rename = "box", default)]
    bbox: Option<BoundingBox>,
}

#[derive(Debug, Default, Deserialize)]
struct BoundingBox {
    #[allow(dead_code)]
    xmin: f32,
    #[allow(dead_code)]
    ymin: f32,
    #[allow(dead_code)]
    xmax: f32,
    #[allow(dead_code)]
    ymax: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> WatchlistGate {
        let cache = EndpointCache::new();
        let cred = Credential::new("hf_test").unwrap();
        WatchlistGate::new(&cache, DEFAULT_DETECTOR_MODEL, &cred).unwrap()
    }

    #[test]
    fn watchlist_matches_are_case_insensitive_substrings() {
        let gate = gate();
        assert!(gate.matches("person"));
        assert!(gate.matches("Person walking a dog"));
        assert!(gate.matches("HUMAN FACE"));
        assert!(!gate.matches("golden retriever"));
        assert!(!gate.matches("Persian cat"));
    }

    #[test]
    fn region_payload_parses_with_and_without_boxes() {
        let with_box = serde_json::json!([
            {"label": "person", "score": 0.98,
             "box": {"xmin": 1.0, "ymin": 2.0, "xmax": 30.0, "ymax": 40.0}}
        ]);
        let regions: Vec<DetectedRegion> = serde_json::from_value(with_box).unwrap();
        assert_eq!(regions.len(), 1);
        assert!(regions[0].bbox.is_some());

        let without_box = serde_json::json!([{"label": "dog", "score": 0.7}]);
        let regions: Vec<DetectedRegion> = serde_json::from_value(without_box).unwrap();
        assert!(regions[0].bbox.is_none());
    }
}
