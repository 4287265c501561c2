use std::collections::BTreeMap;

/// Namespaced text blob container written by the run scheduler. The scan
/// output lives under one of its data entries.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfigArtifact {
    pub namespace: String,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub data: BTreeMap<String, String>,
}

impl ConfigArtifact {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn entry(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}
