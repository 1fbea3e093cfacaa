use crate::registry::DatasetRegistry;
use serde::{Deserialize, Serialize};

/// Name of the dataset every fresh session starts with.
pub const DEFAULT_DATASET: &str = "Default";

/// The unit of storage per dataset: tabular data text and YAML variables text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferPair {
    pub data: String,
    pub vars: String,
}

impl BufferPair {
    pub fn new(data: impl Into<String>, vars: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            vars: vars.into(),
        }
    }

    /// True when neither buffer holds any non-whitespace character.
    pub fn is_blank(&self) -> bool {
        self.data.trim().is_empty() && self.vars.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub name: String,
    pub buffers: BufferPair,
}

impl Dataset {
    pub fn new(name: impl Into<String>, buffers: BufferPair) -> Self {
        Self {
            name: name.into(),
            buffers,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, BufferPair::default())
    }
}

/// A complete DataTemplate value: the datasets and the template they share.
///
/// This is what every codec produces and consumes. A [`crate::session::Session`] adopts one
/// wholesale when a document is loaded or pasted, and hands out one from
/// [`crate::session::Session::snapshot`] when it needs to be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataTemplate {
    pub registry: DatasetRegistry,
    pub template: String,
}

impl DataTemplate {
    pub fn new(registry: DatasetRegistry, template: impl Into<String>) -> Self {
        Self {
            registry,
            template: template.into(),
        }
    }

    /// A DataTemplate with a single `Default` dataset.
    pub fn single(
        data: impl Into<String>,
        vars: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        let mut registry = DatasetRegistry::new();
        if let Some(dataset) = registry.get_mut(DEFAULT_DATASET) {
            dataset.buffers = BufferPair::new(data, vars);
        }
        Self::new(registry, template)
    }

    /// Single form applies when the only dataset is the one named `Default`.
    pub fn is_single_form(&self) -> bool {
        self.registry.len() == 1 && self.registry.active_name() == DEFAULT_DATASET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_buffers() {
        assert!(BufferPair::default().is_blank());
        assert!(BufferPair::new("  \n", "\t").is_blank());
        assert!(!BufferPair::new("a,b", "").is_blank());
    }

    #[test]
    fn test_single_form_detection() {
        let dt = DataTemplate::single("h1,h2\nx,y", "", "{{ h1 }}");
        assert!(dt.is_single_form());
        assert_eq!(dt.registry.active().buffers.data, "h1,h2\nx,y");

        let mut multi = dt.clone();
        multi.registry.add("Lab-1").unwrap();
        assert!(!multi.is_single_form());
    }
}
