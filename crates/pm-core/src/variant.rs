//! Variant catalog: distinct ordered activity sequences and the cases sharing them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CoreError;
use crate::event::Event;
use crate::sequence::{Case, GroupKey, sequence};
use crate::types::{CaseId, QueueId};

/// Joins activities into a variant signature.
pub const SEQUENCE_SEPARATOR: &str = " → ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariantScope {
    /// One sequence per case across the whole log.
    #[default]
    Global,
    /// One sequence per `(queue, case)`, ranked within each queue.
    PerQueue,
}

impl VariantScope {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::PerQueue => "per-queue",
        }
    }
}

impl fmt::Display for VariantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariantScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Self::Global),
            "per-queue" | "per_queue" => Ok(Self::PerQueue),
            _ => Err(CoreError::UnknownScope(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub queue_id: Option<QueueId>,
    /// Dense 1-based rank within the queue, in signature order. Per-queue only.
    pub variant_id: Option<u32>,
    pub sequence: String,
    pub count: u64,
    #[serde(skip)]
    pub cases: Vec<CaseId>,
}

impl Variant {
    /// Activities of the signature, in order.
    pub fn activities(&self) -> impl Iterator<Item = &str> {
        self.sequence.split(SEQUENCE_SEPARATOR)
    }
}

fn signature(case: &Case<'_>) -> String {
    case.activities().collect::<Vec<_>>().join(SEQUENCE_SEPARATOR)
}

/// Groups cases by signature.
///
/// Output is sorted by `(queue, signature)`. Variant ids are assigned on that
/// ordering after grouping, never by frequency.
pub fn discover(events: &[Event], scope: VariantScope) -> Vec<Variant> {
    let group_key = match scope {
        VariantScope::Global => GroupKey::Case,
        VariantScope::PerQueue => GroupKey::QueueAndCase,
    };

    let mut groups: BTreeMap<(Option<QueueId>, String), Vec<CaseId>> = BTreeMap::new();
    for case in sequence(events, group_key) {
        let key = (case.key().queue_id.clone(), signature(&case));
        groups.entry(key).or_default().push(case.case_id().clone());
    }

    let mut variants = Vec::with_capacity(groups.len());
    let mut current_queue: Option<QueueId> = None;
    let mut rank = 0_u32;
    for ((queue_id, sequence), cases) in groups {
        let variant_id = match scope {
            VariantScope::Global => None,
            VariantScope::PerQueue => {
                if current_queue != queue_id {
                    current_queue.clone_from(&queue_id);
                    rank = 0;
                }
                rank += 1;
                Some(rank)
            }
        };
        variants.push(Variant {
            queue_id,
            variant_id,
            sequence,
            count: cases.len() as u64,
            cases,
        });
    }

    tracing::debug!(%scope, variants = variants.len(), "discovered variants");
    variants
}

/// Sorts variants by count, most frequent first. Ties keep their order.
pub fn rank_by_frequency(variants: &mut [Variant]) {
    variants.sort_by(|a, b| b.count.cmp(&a.count));
}
