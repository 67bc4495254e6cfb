// ============================================================
// Layer 6 — Classifier Index
// ============================================================
// Bijective mapping between a character label and the class
// integer the network outputs. Persisted as a flat JSON object
// next to the weights:
//
//   { "0": 0, "1": 1, ..., "A": 10, "B": 11, ... }
//
// Labels are the dataset's sub-directory names sorted
// lexicographically, so the same folder always yields the
// same index.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};

use crate::infra::checkpoint::CheckpointError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierIndex {
    label_to_class: BTreeMap<String, usize>,
    class_to_label: Vec<String>,
}

impl ClassifierIndex {
    /// Build an index by sorting and enumerating `labels`.
    /// Duplicates are collapsed.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sorted: Vec<String> = labels.into_iter().map(Into::into).collect();
        sorted.sort();
        sorted.dedup();

        let label_to_class = sorted
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();
        Self { label_to_class, class_to_label: sorted }
    }

    /// Build from an explicit label→class mapping, rejecting anything
    /// that is not a bijection onto `0..len`.
    pub fn from_mapping(mapping: BTreeMap<String, usize>) -> Result<Self, CheckpointError> {
        let mut class_to_label = vec![None; mapping.len()];
        for (label, &class) in &mapping {
            let Some(slot) = class_to_label.get_mut(class) else {
                return Err(CheckpointError::InvalidIndex(format!(
                    "class {class} for '{label}' is outside 0..{}",
                    mapping.len()
                )));
            };
            if let Some(other) = slot {
                return Err(CheckpointError::InvalidIndex(format!(
                    "labels '{other}' and '{label}' share class {class}"
                )));
            }
            *slot = Some(label.clone());
        }
        // Every slot is filled: n distinct classes in 0..n.
        let class_to_label = class_to_label.into_iter().flatten().collect();
        Ok(Self { label_to_class: mapping, class_to_label })
    }

    pub fn len(&self) -> usize {
        self.class_to_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.class_to_label.is_empty()
    }

    pub fn class_of(&self, label: &str) -> Option<usize> {
        self.label_to_class.get(label).copied()
    }

    /// Reverse lookup. `None` for a class the index doesn't know.
    pub fn label_of(&self, class: usize) -> Option<&str> {
        self.class_to_label.get(class).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.class_to_label
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.label_to_class)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mapping: BTreeMap<String, usize> =
            serde_json::from_str(json).context("Class index is not a label->class JSON object")?;
        Ok(Self::from_mapping(mapping)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Cannot write class index to '{}'", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read class index from '{}'", path.display()))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_sorted_before_enumeration() {
        let index = ClassifierIndex::from_labels(["B", "3", "A", "A"]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.class_of("3"), Some(0));
        assert_eq!(index.class_of("A"), Some(1));
        assert_eq!(index.label_of(2), Some("B"));
        assert_eq!(index.label_of(3), None);
    }

    #[test]
    fn json_round_trip_preserves_bijection() {
        let index = ClassifierIndex::from_labels(('A'..='Z').chain('0'..='9').map(String::from));
        let restored = ClassifierIndex::from_json(&index.to_json().unwrap()).unwrap();
        assert_eq!(restored, index);
        for class in 0..index.len() {
            let label = restored.label_of(class).unwrap();
            assert_eq!(restored.class_of(label), Some(class));
        }
    }

    #[test]
    fn reads_plain_label_to_class_objects() {
        let index = ClassifierIndex::from_json(r#"{"A": 1, "7": 0}"#).unwrap();
        assert_eq!(index.label_of(0), Some("7"));
        assert_eq!(index.label_of(1), Some("A"));
    }

    #[test]
    fn rejects_shared_classes() {
        assert!(ClassifierIndex::from_json(r#"{"A": 0, "B": 0}"#).is_err());
    }

    #[test]
    fn rejects_gaps() {
        assert!(ClassifierIndex::from_json(r#"{"A": 0, "B": 2}"#).is_err());
    }

    #[test]
    fn save_and_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("class_index.json");
        let index = ClassifierIndex::from_labels(["X", "Y"]);
        index.save(&path).unwrap();
        assert_eq!(ClassifierIndex::load(&path).unwrap(), index);
    }
}
