//! Anonymous matching on perpetrator identifiers
//!
//! Matching compares normalized identifiers only. Report ciphertext is never
//! opened here.

mod engine;
mod identifier;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use engine::MatchingEngine;
pub use identifier::{normalize, perpetrator_key, MAX_IDENTIFIER_LEN};

/// One report's entry for one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub id: Uuid,
    pub report_id: Uuid,
    pub owner: Uuid,
    pub site_id: u32,
    /// Normalized form
    pub identifier: String,
    pub perpetrator: String,
    pub created_at: u64,
    /// Insertion order, assigned by the store
    pub seq: u64,
    /// Whether this row's owner has been told about the match
    pub notified: bool,
}

impl MatchReport {
    pub fn new(report_id: Uuid, owner: Uuid, site_id: u32, identifier: String) -> Self {
        let perpetrator = perpetrator_key(&identifier);
        Self {
            id: Uuid::new_v4(),
            report_id,
            owner,
            site_id,
            identifier,
            perpetrator,
            created_at: crate::now(),
            seq: 0,
            notified: false,
        }
    }

    /// Submission order
    pub fn order_key(&self) -> (u64, u64) {
        (self.created_at, self.seq)
    }
}

/// When and how groups trigger notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Trigger on every submission; otherwise wait for `run_pending`
    pub immediate: bool,
    /// Distinct owners needed before a group counts as a match
    pub threshold: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            immediate: true,
            threshold: 2,
        }
    }
}
