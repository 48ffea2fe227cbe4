//! BreedLens Core
//!
//! Core types, traits, and utilities shared across BreedLens components.
//!
//! This crate provides:
//! - Common types for predictions, gate decisions, and credentials
//! - Error types and result handling
//! - Uploaded image decoding shared by the gate and the primary classifier

pub mod error;
pub mod image;
pub mod types;

pub use error::{Error, Result};
pub use image::{is_supported_upload, DecodedImage, SUPPORTED_EXTENSIONS};
pub use types::{Credential, GateDecision, PredictionItem};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::image::DecodedImage;
    pub use crate::types::{Credential, GateDecision, PredictionItem};
}
