//! Credential acquisition
//!
//! The bearer token is resolved from the first available source: the
//! `HF_TOKEN` environment variable, a secrets file named in configuration,
//! or an interactive terminal prompt. All sources produce the same opaque
//! `Credential`; downstream code never learns where a token came from.

use breedlens_core::{Credential, Result};
use std::io::{BufRead, Write};
use std::path::Path;

/// Environment variable holding the inference API token
pub const TOKEN_ENV_VAR: &str = "HF_TOKEN";

/// Where a resolved credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Process environment
    Environment,
    /// Secrets file on disk
    SecretsFile,
    /// Interactive terminal prompt
    Prompt,
}

/// Resolve a credential from the environment, then an optional secrets
/// file. Returns `None` when neither source yields a non-empty token.
///
/// The token value itself is never logged; only the source is.
pub fn resolve(secrets_file: Option<&Path>) -> Result<Option<(Credential, CredentialSource)>> {
    if let Ok(value) = std::env::var(TOKEN_ENV_VAR) {
        if let Some(credential) = Credential::new(value) {
            tracing::info!(source = ?CredentialSource::Environment, "credential resolved");
            return Ok(Some((credential, CredentialSource::Environment)));
        }
    }

    if let Some(path) = secrets_file {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            if let Some(credential) = Credential::new(contents.trim()) {
                tracing::info!(source = ?CredentialSource::SecretsFile, "credential resolved");
                return Ok(Some((credential, CredentialSource::SecretsFile)));
            }
            tracing::warn!(path = %path.display(), "secrets file exists but holds no token");
        }
    }

    Ok(None)
}

/// Prompt for a token on the terminal. Used by the CLI when no other source
/// is available; returns `None` if the user enters nothing.
pub fn prompt_for_token() -> Result<Option<(Credential, CredentialSource)>> {
    eprint!("Enter Hugging Face token: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    Ok(Credential::new(line.trim()).map(|c| (c, CredentialSource::Prompt)))
}
