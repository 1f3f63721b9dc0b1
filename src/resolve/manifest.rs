use super::types::{InputSource, InputSpec};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// Role to source mapping, in document order.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<(String, InputSource)>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestEntry {
    Locator(String),
    Described { fileurl: String },
}

impl Manifest {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::invalid_manifest(format!("malformed JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::invalid_manifest("expected a JSON object of roles"));
        };
        if map.is_empty() {
            return Err(Error::invalid_manifest("no inputs listed"));
        }

        let mut entries = Vec::with_capacity(map.len());
        for (role, entry) in map {
            if role.trim().is_empty() {
                return Err(Error::invalid_manifest("empty role name"));
            }

            let entry: ManifestEntry = serde_json::from_value(entry).map_err(|_| {
                Error::invalid_manifest(format!(
                    "role '{}' must be a locator string or an object with a 'fileurl'",
                    role
                ))
            })?;
            let locator = match entry {
                ManifestEntry::Locator(locator) => locator,
                ManifestEntry::Described { fileurl } => fileurl,
            };
            let source = InputSource::from_locator(&locator)
                .map_err(|e| e.in_role(&role))?;

            entries.push((role, source));
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(role, _)| role.as_str())
    }

    pub fn into_specs(self) -> Vec<InputSpec> {
        self.entries
            .into_iter()
            .map(|(role, source)| InputSpec { role, source })
            .collect()
    }
}
