//! Core types for BreedLens

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One ranked result from a classification call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionItem {
    /// Human-readable class label (e.g. a breed name)
    pub label: String,

    /// Model confidence in [0.0, 1.0]
    pub confidence: f32,
}

impl PredictionItem {
    /// Create a new prediction item
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Confidence expressed as a percentage in [0.0, 100.0]
    pub fn confidence_pct(&self) -> f32 {
        self.confidence * 100.0
    }

    /// Whether the label contains the given needle, ignoring ASCII case
    pub fn label_contains(&self, needle: &str) -> bool {
        self.label
            .to_ascii_lowercase()
            .contains(&needle.to_ascii_lowercase())
    }
}

/// Outcome of the preliminary gate check for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum GateDecision {
    /// Continue to primary classification
    Proceed,

    /// Skip primary classification for this image
    Suppress {
        /// Why the gate suppressed (shown to the user)
        reason: String,
    },
}

impl GateDecision {
    /// Create a suppress decision with a reason
    pub fn suppress(reason: impl Into<String>) -> Self {
        Self::Suppress {
            reason: reason.into(),
        }
    }

    /// Whether primary classification must be skipped
    pub fn is_suppress(&self) -> bool {
        matches!(self, Self::Suppress { .. })
    }
}

/// Bearer token authorizing calls to the hosted inference service.
///
/// The token value is never logged, serialized, or displayed; only its
/// fingerprint participates in cache keys.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token string. Returns `None` for empty/whitespace tokens.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// The raw bearer token, for constructing an Authorization header
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Stable hex fingerprint of the token, safe to use in cache keys
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex_encode(&digest)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
