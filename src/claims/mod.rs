//! Claim extraction and the authorization decision engine.
//!
//! A [`ClaimParser`] holds up to three independently configured rules:
//! the post-login redirect domain, the forwarded identity headers and the
//! authorization predicates. Each rule resolves a [`ClaimPath`] and runs a
//! [`Pipeline`] over the value; any failure fails the whole operation.

pub mod config;
pub mod path;
pub mod pipeline;

pub use config::{ClaimConfig, Expected, Predicate, ROLE_RANKING};
pub use path::ClaimPath;
pub use pipeline::{Pipeline, Stage};

use serde_json::Value;
use std::{collections::BTreeMap, path::Path};
use thiserror::Error;

use crate::error::Error;

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Claimpath does not exist: {0}")]
    PathNotFound(String),
    #[error("Could not parse claimValue at {0}")]
    Unresolved(String),
    #[error("Could not parse claimValue: {header}: {source}")]
    Header {
        header: String,
        #[source]
        source: Box<ClaimError>,
    },
    #[error("{0}")]
    Config(String),
}

impl From<ClaimError> for Error {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::Config(message) => Self::Configuration(message),
            other => Self::ClaimResolution(other.to_string()),
        }
    }
}

/// Read-only after startup; shared across requests behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ClaimParser {
    config: ClaimConfig,
}

impl ClaimParser {
    #[must_use]
    pub fn new(config: ClaimConfig) -> Self {
        Self { config }
    }

    /// # Errors
    /// Returns [`ClaimError::Config`] if the document is invalid.
    pub fn from_json(raw: &str) -> Result<Self, ClaimError> {
        ClaimConfig::from_json(raw).map(Self::new)
    }

    /// # Errors
    /// Returns [`ClaimError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ClaimError> {
        ClaimConfig::load(path).map(Self::new)
    }

    #[must_use]
    pub fn config(&self) -> &ClaimConfig {
        &self.config
    }

    /// Domain to send the browser to after a successful callback.
    ///
    /// `Ok(None)` when no redirect rule is configured.
    ///
    /// # Errors
    /// Fails if the claim path is missing or the pipeline dead-ends.
    pub fn redirect_domain(&self, claims: &Value) -> Result<Option<String>, ClaimError> {
        let Some(rule) = &self.config.callback_redirect else {
            return Ok(None);
        };
        evaluate(&rule.claim_path, &rule.pipe_parser, claims).map(Some)
    }

    /// Header name to value mapping built from the claims.
    ///
    /// All or nothing: the first failing entry fails the call and names the
    /// offending header.
    ///
    /// # Errors
    /// Returns [`ClaimError::Header`] for the first entry that cannot resolve.
    pub fn forwarded_headers(
        &self,
        claims: &Value,
    ) -> Result<Option<BTreeMap<String, String>>, ClaimError> {
        let Some(rules) = &self.config.forwarded_headers else {
            return Ok(None);
        };

        rules
            .iter()
            .map(|rule| {
                evaluate(&rule.claim_path, &rule.pipe_parser, claims)
                    .map(|value| (rule.header.clone(), value))
                    .map_err(|source| ClaimError::Header {
                        header: rule.header.clone(),
                        source: Box::new(source),
                    })
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Some)
    }

    /// Conjunction of every configured predicate.
    ///
    /// `Ok(Some(false))` when a rule resolves but its value does not match.
    ///
    /// # Errors
    /// A rule whose path or pipeline cannot resolve is an error, not a
    /// denial.
    pub fn authorization_check(&self, claims: &Value) -> Result<Option<bool>, ClaimError> {
        let Some(rules) = &self.config.authorization_check else {
            return Ok(None);
        };

        for rule in rules {
            let value = evaluate(&rule.claim_path, &rule.pipe_parser, claims)?;
            if !rule.value.matches(&value) {
                return Ok(Some(false));
            }
        }
        Ok(Some(true))
    }
}

fn evaluate(path: &ClaimPath, pipeline: &Pipeline, claims: &Value) -> Result<String, ClaimError> {
    let seed = path.resolve(claims)?;
    pipeline
        .run(seed)
        .ok_or_else(|| ClaimError::Unresolved(path.to_string()))
}
