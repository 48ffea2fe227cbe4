//! Primary breed classifier adapter
//!
//! Wraps a hosted pretrained image-classification model behind the
//! `BreedClassifier` trait. The hosted API returns a loose JSON array of
//! label/score objects; that payload is mapped to typed `PredictionItem`s
//! right at this boundary, and malformed entries fail the call rather than
//! leaking upward.

use crate::endpoint::{EndpointCache, ModelEndpoint};
use async_trait::async_trait;
use breedlens_core::{Credential, DecodedImage, Error, PredictionItem, Result};
use serde::Deserialize;
use std::sync::Arc;

/// Default primary classification model
pub const DEFAULT_PRIMARY_MODEL: &str = "google/vit-base-patch16-224";

/// Trait for the primary classifier
#[async_trait]
pub trait BreedClassifier: Send + Sync {
    /// Classify the given image, returning the full ranked prediction list
    async fn classify(&self, image: &DecodedImage) -> Result<Vec<PredictionItem>>;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// Primary classifier backed by a hosted inference endpoint
pub struct HostedBreedClassifier {
    name: String,
    endpoint: Option<Arc<ModelEndpoint>>,
}

impl HostedBreedClassifier {
    /// Create a classifier for `model_id`.
    ///
    /// Without a credential no endpoint handle is constructed and every
    /// `classify` call fails with `MissingCredential` before touching the
    /// network.
    pub fn new(
        cache: &EndpointCache,
        model_id: &str,
        credential: Option<&Credential>,
    ) -> Result<Self> {
        let endpoint = match credential {
            Some(credential) => Some(cache.endpoint(model_id, credential)?),
            None => None,
        };

        Ok(Self {
            name: format!("hosted:{model_id}"),
            endpoint,
        })
    }
}

#[async_trait]
impl BreedClassifier for HostedBreedClassifier {
    async fn classify(&self, image: &DecodedImage) -> Result<Vec<PredictionItem>> {
        let endpoint = self.endpoint.as_ref().ok_or(Error::MissingCredential)?;

        let payload = endpoint.infer_image(image).await?;
        let predictions = parse_predictions(endpoint.model_id(), payload)?;

        tracing::debug!(
            model = endpoint.model_id(),
            count = predictions.len(),
            "classification complete"
        );

        Ok(predictions)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// Hosted API response structures
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawPrediction {
    label: String,
    score: f32,
}

/// Map the hosted API's JSON payload to typed predictions.
///
/// Entries with empty labels, non-finite or out-of-range scores, and
/// sequences not ordered by descending score are all rejected as
/// `InferenceUnavailable`.
fn parse_predictions(model_id: &str, payload: serde_json::Value) -> Result<Vec<PredictionItem>> {
    let raw: Vec<RawPrediction> = serde_json::from_value(payload)
        .map_err(|e| Error::inference(format!("model {model_id} sent malformed predictions: {e}")))?;

    let mut predictions = Vec::with_capacity(raw.len());
    let mut previous_score = f32::INFINITY;

    for entry in raw {
        if entry.label.trim().is_empty() {
            return Err(Error::inference(format!(
                "model {model_id} sent a prediction without a label"
            )));
        }
        if !entry.score.is_finite() || !(0.0..=1.0).contains(&entry.score) {
            return Err(Error::inference(format!(
                "model {model_id} sent out-of-range score {} for label {:?}",
                entry.score, entry.label
            )));
        }
        if entry.score > previous_score {
            return Err(Error::inference(format!(
                "model {model_id} sent predictions out of rank order"
            )));
        }

        previous_score = entry.score;
        predictions.push(PredictionItem::new(entry.label, entry.score));
    }

    Ok(predictions)
}
