//! Anonymized label assignment for Stage 2.
//!
//! Stage-1 answers are shown to evaluators under opaque labels
//! ("Response A", "Response B", ...) so that rankings cannot be biased by
//! model identity. [`LabelMap`] is the explicit bijection from label to
//! model, scoped to one turn; the ranking math never sees model ids until
//! labels are resolved through this map.
//!
//! Labels are assigned in stage-1 completion order, not request order, so
//! a fixed council ordering cannot leak identity through position.

use serde::{Deserialize, Serialize};

use crate::core::model::ModelId;

const LABEL_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Bijective map from anonymized label to model id, scoped to one turn.
///
/// Entry order is the label assignment order (stage-1 completion order),
/// which also serves as the deterministic tie-break for aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelMap {
    entries: Vec<(String, ModelId)>,
}

impl LabelMap {
    /// Assign labels to models in the order given.
    ///
    /// At most 26 models can be labeled; extras are ignored (a council of
    /// that size is a configuration error caught upstream).
    pub fn assign(models_in_completion_order: &[ModelId]) -> Self {
        let entries = models_in_completion_order
            .iter()
            .take(LABEL_ALPHABET.len())
            .enumerate()
            .map(|(i, model)| {
                let label = format!("Response {}", LABEL_ALPHABET[i] as char);
                (label, model.clone())
            })
            .collect();
        Self { entries }
    }

    /// Resolve a label to its model, if assigned this turn.
    pub fn model_for(&self, label: &str) -> Option<&ModelId> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, m)| m)
    }

    /// Resolve a model to its label, if assigned this turn.
    pub fn label_for(&self, model: &ModelId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, m)| m == model)
            .map(|(l, _)| l.as_str())
    }

    /// Labels in assignment order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    /// (label, model) pairs in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelId)> {
        self.entries.iter().map(|(l, m)| (l.as_str(), m))
    }

    /// Position of a model in assignment order (used for tie-breaking).
    pub fn position_of(&self, model: &ModelId) -> Option<usize> {
        self.entries.iter().position(|(_, m)| m == model)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
