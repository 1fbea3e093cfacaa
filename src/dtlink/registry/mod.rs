//! # Dataset Registry
//!
//! An insertion-ordered mapping from dataset name to [`BufferPair`], with exactly one
//! dataset marked active. The registry is never empty: a fresh registry holds a single
//! `Default` dataset, and removing the last dataset is refused.
//!
//! The registry stores buffers only. The live content of whatever the user is editing is
//! owned by the [`crate::session::Session`], which hands it back through
//! [`DatasetRegistry::switch_active`] so in-progress edits are never lost on a switch.
//!
//! ## Naming Rules
//!
//! See [`validation`]. Names are compared exactly (`Lab` and `lab` are distinct).

pub mod validation;

use crate::error::ValidationError;
use crate::model::{BufferPair, Dataset, DEFAULT_DATASET};

pub use validation::validate_dataset_name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRegistry {
    entries: Vec<Dataset>,
    active: usize,
}

/// What the presentation layer needs to enumerate datasets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetIndex {
    pub names: Vec<String>,
    pub active: String,
    /// Selecting and deleting only make sense with more than one dataset.
    pub can_select: bool,
    pub can_delete: bool,
}

/// Result of a successful [`DatasetRegistry::remove`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub dataset: Dataset,
    /// The removed dataset was active; the first remaining one is active now.
    pub active_changed: bool,
}

impl Default for DatasetRegistry {
    fn default() -> Self {
        Self {
            entries: vec![Dataset::empty(DEFAULT_DATASET)],
            active: 0,
        }
    }
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from decoded datasets, keeping their order. The first becomes active.
    pub fn from_datasets(datasets: Vec<Dataset>) -> Result<Self, ValidationError> {
        if datasets.is_empty() {
            return Err(ValidationError::LastDatasetRemaining);
        }

        let mut registry = Self {
            entries: Vec::with_capacity(datasets.len()),
            active: 0,
        };
        for dataset in datasets {
            validate_dataset_name(&dataset.name)?;
            if registry.contains(&dataset.name) {
                return Err(ValidationError::DuplicateName(dataset.name));
            }
            registry.entries.push(dataset);
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dataset> {
        self.entries.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Dataset> {
        self.position(name).map(|i| &self.entries[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Dataset> {
        self.position(name).map(move |i| &mut self.entries[i])
    }

    pub fn active(&self) -> &Dataset {
        &self.entries[self.active]
    }

    pub fn active_name(&self) -> &str {
        &self.entries[self.active].name
    }

    /// Names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.name.as_str()).collect()
    }

    /// Adds an empty dataset. Does not change the active dataset.
    pub fn add(&mut self, name: &str) -> Result<&Dataset, ValidationError> {
        validate_dataset_name(name)?;
        if self.contains(name) {
            return Err(ValidationError::DuplicateName(name.to_string()));
        }
        self.entries.push(Dataset::empty(name));
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Removes a dataset. If it was active, the first remaining dataset becomes active.
    ///
    /// Any confirmation the user must give has already happened by the time this runs.
    pub fn remove(&mut self, name: &str) -> Result<Removal, ValidationError> {
        let position = self
            .position(name)
            .ok_or_else(|| ValidationError::UnknownDataset(name.to_string()))?;
        if self.entries.len() == 1 {
            return Err(ValidationError::LastDatasetRemaining);
        }

        let dataset = self.entries.remove(position);
        let active_changed = position == self.active;
        if active_changed {
            self.active = 0;
        } else if position < self.active {
            self.active -= 1;
        }

        Ok(Removal {
            dataset,
            active_changed,
        })
    }

    /// Makes `name` active and returns its buffers for loading into the editor.
    ///
    /// When `live` is given it is the editor's current content, which is first written back
    /// into the previously active dataset.
    pub fn switch_active(
        &mut self,
        name: &str,
        live: Option<BufferPair>,
    ) -> Result<&BufferPair, ValidationError> {
        let target = self
            .position(name)
            .ok_or_else(|| ValidationError::UnknownDataset(name.to_string()))?;
        if let Some(live) = live {
            self.entries[self.active].buffers = live;
        }
        self.active = target;
        Ok(&self.entries[target].buffers)
    }

    /// Recomputes the enumeration the presentation layer shows. Pure.
    pub fn rebuild_index(&self) -> DatasetIndex {
        let many = self.entries.len() > 1;
        DatasetIndex {
            names: self.entries.iter().map(|d| d.name.clone()).collect(),
            active: self.active_name().to_string(),
            can_select: many,
            can_delete: many,
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|d| d.name == name)
    }
}
