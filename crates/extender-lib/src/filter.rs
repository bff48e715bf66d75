//! Capability label predicate

use crate::config::ConfigError;
use crate::models::Machine;

pub const DEFAULT_LABEL_KEY: &str = "green";
pub const DEFAULT_LABEL_VALUE: &str = "true";

/// Admits nodes whose label `key` equals `value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFilter {
    key: String,
    value: String,
}

impl Default for LabelFilter {
    fn default() -> Self {
        Self {
            key: DEFAULT_LABEL_KEY.to_string(),
            value: DEFAULT_LABEL_VALUE.to_string(),
        }
    }
}

impl LabelFilter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConfigError::EmptyLabelKey);
        }
        Ok(Self {
            key,
            value: value.into(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// `Err` carries the human-readable failure reason
    pub fn check(&self, machine: &Machine) -> Result<(), String> {
        match machine.labels.get(&self.key) {
            Some(v) if *v == self.value => Ok(()),
            Some(v) => Err(format!(
                "NodeLabelMatchFailure: label {}={} does not match required value {}",
                self.key, v, self.value
            )),
            None => Err(format!(
                "NodeLabelMatchFailure: node lacks required label {}={}",
                self.key, self.value
            )),
        }
    }
}
