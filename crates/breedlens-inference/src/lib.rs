//! BreedLens Inference
//!
//! Adapters over hosted pretrained models: the primary breed classifier,
//! the secondary gate detectors, credential acquisition, and the shared
//! endpoint cache.
//!
//! All inference is delegated over HTTP; this crate owns the boundary where
//! loose vendor JSON becomes typed results and where credentials are
//! attached to requests.

pub mod classifier;
pub mod credential;
pub mod endpoint;
pub mod gate;

pub use classifier::{BreedClassifier, HostedBreedClassifier, DEFAULT_PRIMARY_MODEL};
pub use credential::{prompt_for_token, resolve, CredentialSource, TOKEN_ENV_VAR};
pub use endpoint::{EndpointCache, ModelEndpoint, DEFAULT_BASE_URL};
pub use gate::{FaceRegionGate, Gate, WatchlistGate, DEFAULT_DETECTOR_MODEL, DEFAULT_WATCHLIST};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{BreedClassifier, HostedBreedClassifier};
    pub use crate::endpoint::EndpointCache;
    pub use crate::gate::{FaceRegionGate, Gate, WatchlistGate};
}
