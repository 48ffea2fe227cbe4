//! Hosted model endpoints and the shared endpoint cache
//!
//! A `ModelEndpoint` is the configured handle for one hosted model: an HTTP
//! client, the model id, and the bearer credential. Handles are constructed
//! at most once per `(model id, credential)` pair and memoized in an
//! `EndpointCache` that callers receive as an explicit dependency. The cache
//! key includes the credential fingerprint, so a handle configured for one
//! token can never be served to a caller holding a different token.

use breedlens_core::{Credential, DecodedImage, Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default hosted inference API base URL
pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Connect/read timeout applied to the underlying HTTP client
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Configured handle for one hosted model
pub struct ModelEndpoint {
    client: reqwest::Client,
    url: String,
    model_id: String,
    credential: Credential,
}

impl ModelEndpoint {
    fn new(base_url: &str, model_id: &str, credential: Credential) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/models/{}", base_url.trim_end_matches('/'), model_id),
            model_id: model_id.to_string(),
            credential,
        })
    }

    /// The model this endpoint is bound to
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Post encoded image bytes and return the raw JSON response.
    ///
    /// Every transport, auth, or quota failure maps to
    /// `Error::InferenceUnavailable`; callers take no further pipeline steps.
    pub async fn infer_image(&self, image: &DecodedImage) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.credential.expose())
            .header(reqwest::header::CONTENT_TYPE, image.mime_type())
            .body(bytes::Bytes::copy_from_slice(image.encoded_bytes()))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::inference(format!("model {} timed out", self.model_id))
                } else {
                    Error::inference(format!("model {} unreachable: {e}", self.model_id))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(model = %self.model_id, %status, "inference call rejected");
            return Err(Error::inference(format!(
                "model {} returned {status}: {}",
                self.model_id,
                body.chars().take(200).collect::<String>()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::inference(format!("model {} sent invalid JSON: {e}", self.model_id)))
    }
}

impl std::fmt::Debug for ModelEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelEndpoint")
            .field("model_id", &self.model_id)
            .field("url", &self.url)
            .finish()
    }
}

/// Process-wide memoization of model endpoints.
///
/// Check-then-create runs under a single lock, so concurrent sessions can
/// never race two initializations of the same handle.
pub struct EndpointCache {
    endpoints: Mutex<HashMap<(String, String), Arc<ModelEndpoint>>>,
    base_url: String,
}

impl Default for EndpointCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointCache {
    /// Create a cache targeting the default hosted inference API
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a cache targeting a specific inference API base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            endpoints: Mutex::new(HashMap::new()),
            base_url: base_url.into(),
        }
    }

    /// Get the memoized endpoint for `(model_id, credential)`, constructing
    /// it on first use.
    pub fn endpoint(&self, model_id: &str, credential: &Credential) -> Result<Arc<ModelEndpoint>> {
        let key = (model_id.to_string(), credential.fingerprint());

        let mut endpoints = self.endpoints.lock();
        if let Some(endpoint) = endpoints.get(&key) {
            return Ok(Arc::clone(endpoint));
        }

        tracing::debug!(model = model_id, "constructing hosted model endpoint");
        let endpoint = Arc::new(ModelEndpoint::new(&self.base_url, model_id, credential.clone())?);
        endpoints.insert(key, Arc::clone(&endpoint));
        Ok(endpoint)
    }

    /// Number of distinct handles currently memoized
    pub fn len(&self) -> usize {
        self.endpoints.lock().len()
    }

    /// Whether the cache holds no handles
    pub fn is_empty(&self) -> bool {
        self.endpoints.lock().is_empty()
    }
}
