//! Decrypted report payload

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Answers keyed by form field name (`question_{id}`)
pub type Answers = BTreeMap<String, Value>;

/// Plaintext of a report's `encrypted_data`.
///
/// Keyed, never positional: merging only ever adds or replaces keys, so
/// answers survive wizard navigation and question-set changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    #[serde(default)]
    pub data: Answers,
}

impl ReportRecord {
    pub fn new(data: Answers) -> Self {
        Self { data }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Overlay `partial` onto the stored answers
    pub fn merge(&mut self, partial: Answers) {
        self.data.extend(partial);
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
