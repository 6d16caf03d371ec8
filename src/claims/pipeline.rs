//! Claim transform stages and the pipeline that chains them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One named transform. Config uses the `{"func": ..., "value": ...}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "func", deny_unknown_fields)]
pub enum Stage {
    /// Uppercase the first character; fails on empty input.
    #[serde(rename = "CapitalizeFirstLetter", alias = "Capitalize")]
    Capitalize,
    /// Append a fixed suffix.
    #[serde(rename = "Sufix", alias = "Suffix")]
    Suffix { value: String },
    /// Pass the input through only if it equals `value`.
    EqualsString { value: String },
    /// Pick the first entry of `value` that the input array contains.
    #[serde(rename = "OneValueFromArrayPrio", alias = "OneOfPrioritized")]
    OneOfPrioritized { value: Vec<String> },
    /// Exact-key lookup.
    Mapper { value: BTreeMap<String, String> },
}

impl Stage {
    /// Apply the stage to a string or array input. `None` is a dead end.
    #[must_use]
    pub fn apply(&self, input: &Value) -> Option<String> {
        match (self, input) {
            (Self::Capitalize, Value::String(s)) => capitalize_first_letter(s),
            (Self::Suffix { value }, Value::String(s)) => Some(format!("{s}{value}")),
            (Self::EqualsString { value }, Value::String(s)) => (s == value).then(|| s.clone()),
            (Self::OneOfPrioritized { value }, Value::Array(items)) => value
                .iter()
                .find(|candidate| {
                    items
                        .iter()
                        .any(|item| item.as_str() == Some(candidate.as_str()))
                })
                .cloned(),
            (Self::Mapper { value }, Value::String(s)) => value.get(s).cloned(),
            _ => None,
        }
    }
}

fn capitalize_first_letter(input: &str) -> Option<String> {
    let mut chars = input.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Ordered list of stages. Every stage must succeed for the pipeline to yield
/// a value; the final value must be a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    #[must_use]
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run the stages left to right over `seed`.
    #[must_use]
    pub fn run(&self, seed: &Value) -> Option<String> {
        if !matches!(seed, Value::String(_) | Value::Array(_)) {
            return None;
        }

        let mut current: Option<String> = None;
        for stage in &self.stages {
            let output = match current.take() {
                Some(previous) => stage.apply(&Value::String(previous)),
                None => stage.apply(seed),
            };
            current = Some(output?);
        }

        match (current, seed) {
            (Some(value), _) => Some(value),
            (None, Value::String(s)) => Some(s.clone()),
            (None, _) => None,
        }
    }
}
