//! Claims configuration document.

use axum::http::HeaderName;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};

use super::{path::ClaimPath, pipeline::Pipeline, pipeline::Stage, ClaimError};

/// Ranking used by the role checks and the default role headers.
pub const ROLE_RANKING: [&str; 3] = ["admin", "editor", "viewer"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClaimConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_redirect: Option<RedirectRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_headers: Option<Vec<HeaderRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_check: Option<Vec<CheckRule>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RedirectRule {
    pub claim_path: ClaimPath,
    pub pipe_parser: Pipeline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HeaderRule {
    pub header: String,
    pub claim_path: ClaimPath,
    pub pipe_parser: Pipeline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckRule {
    pub value: Expected,
    pub claim_path: ClaimPath,
    pub pipe_parser: Pipeline,
}

/// What a pipeline result must satisfy for an authorization rule to pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expected {
    Literal(String),
    Predicate(Predicate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "predicate", rename_all = "camelCase")]
pub enum Predicate {
    OneOf {
        values: Vec<String>,
    },
    /// Passes when the value is ranked and sits at or above `required`.
    /// Lower index means higher rank.
    RankAtLeast {
        ranking: Vec<String>,
        required: String,
    },
}

impl Expected {
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Literal(expected) => expected == value,
            Self::Predicate(Predicate::OneOf { values }) => values.iter().any(|v| v == value),
            Self::Predicate(Predicate::RankAtLeast { ranking, required }) => {
                let rank = |name: &str| ranking.iter().position(|r| r == name);
                match (rank(value), rank(required)) {
                    (Some(actual), Some(required)) => actual <= required,
                    _ => false,
                }
            }
        }
    }
}

impl ClaimConfig {
    /// Parse and validate a JSON claims document.
    ///
    /// # Errors
    /// Returns [`ClaimError::Config`] for malformed JSON, unknown stages,
    /// invalid header names, or a `rankAtLeast` whose required name is not
    /// part of its ranking.
    pub fn from_json(raw: &str) -> Result<Self, ClaimError> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| ClaimError::Config(format!("invalid claims config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a claims document from disk.
    ///
    /// # Errors
    /// Returns [`ClaimError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ClaimError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClaimError::Config(format!(
                "failed to read claims config {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }

    /// Configuration used when no document is given: redirect to the
    /// organization subdomain and forward the proxy identity headers.
    #[must_use]
    pub fn builtin(domain: &str) -> Self {
        let ranking = || Stage::OneOfPrioritized {
            value: ROLE_RANKING.iter().map(ToString::to_string).collect(),
        };
        let header = |name: &str, path: &str, stages: Vec<Stage>| HeaderRule {
            header: name.to_string(),
            claim_path: ClaimPath::new(path),
            pipe_parser: Pipeline::new(stages),
        };
        let grafana_roles: BTreeMap<String, String> = [
            ("admin", "editor"),
            ("editor", "editor"),
            ("viewer", "viewer"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        Self {
            callback_redirect: Some(RedirectRule {
                claim_path: ClaimPath::new("active_organization.name"),
                pipe_parser: Pipeline::new(vec![Stage::Suffix {
                    value: format!(".{domain}"),
                }]),
            }),
            forwarded_headers: Some(vec![
                header("X-PROXY-USER", "email", Vec::new()),
                header("X-PROXY-EMAIL", "email", Vec::new()),
                header("X-PROXY-NAME", "name", Vec::new()),
                header(
                    "X-PROXY-ROLE",
                    "active_organization.role",
                    vec![ranking(), Stage::Capitalize],
                ),
                header(
                    "X-PROXY-GRAFANA-ROLE",
                    "active_organization.role",
                    vec![
                        ranking(),
                        Stage::Mapper {
                            value: grafana_roles,
                        },
                        Stage::Capitalize,
                    ],
                ),
                header(
                    "X-Scope-OrgID",
                    "active_organization.attribute.prometheus_tenant.0",
                    Vec::new(),
                ),
            ]),
            authorization_check: None,
        }
    }

    fn validate(&self) -> Result<(), ClaimError> {
        for rule in self.forwarded_headers.iter().flatten() {
            HeaderName::from_bytes(rule.header.as_bytes()).map_err(|_| {
                ClaimError::Config(format!("invalid header name: {:?}", rule.header))
            })?;
        }
        for rule in self.authorization_check.iter().flatten() {
            if let Expected::Predicate(Predicate::RankAtLeast { ranking, required }) = &rule.value
            {
                if !ranking.contains(required) {
                    return Err(ClaimError::Config(format!(
                        "required rank {required:?} is not part of ranking for {}",
                        rule.claim_path
                    )));
                }
            }
        }
        Ok(())
    }
}
