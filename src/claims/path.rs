//! Dot-segmented claim paths.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use super::ClaimError;

/// A path such as `active_organization.attribute.prometheus_tenant.0`.
///
/// Numeric segments index arrays; every other segment is an object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPath {
    raw: String,
    segments: Vec<String>,
}

impl ClaimPath {
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            segments: raw.split('.').map(str::to_string).collect(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Walk `claims` along the path.
    ///
    /// # Errors
    /// Returns [`ClaimError::PathNotFound`] on a missing key, an out-of-range
    /// index, or a segment that lands on a scalar.
    pub fn resolve<'a>(&self, claims: &'a Value) -> Result<&'a Value, ClaimError> {
        self.segments
            .iter()
            .try_fold(claims, |current, segment| {
                let next = match current {
                    Value::Array(items) => segment
                        .parse::<usize>()
                        .ok()
                        .and_then(|index| items.get(index)),
                    Value::Object(map) => map.get(segment),
                    _ => None,
                };
                next.ok_or_else(|| ClaimError::PathNotFound(self.raw.clone()))
            })
    }
}

impl fmt::Display for ClaimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for ClaimPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ClaimPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Err(serde::de::Error::custom("claimPath must not be empty"));
        }
        Ok(Self::new(&raw))
    }
}
