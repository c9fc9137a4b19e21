//! Tag aggregation and the consensus decision
//!
//! Consensus is computed from current state only: every user contributes their
//! latest value for each tag they touched, free-text values are ignored, and a
//! tag blocks agreement when too many distinct values were observed for it.

use crate::models::{BooleanLiterals, TagMap, TagValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Per tag, per textual value: number of users who chose that value
pub type TagSummary = BTreeMap<String, BTreeMap<String, usize>>;

/// How many distinct values a tag may show before taggers disagree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisagreementThreshold {
    /// More than one distinct value disagrees
    #[default]
    Strict,
    /// More than two distinct values disagree.
    ///
    /// Reproduces the earlier tagging tool so that verdicts on previously
    /// collected data do not change.
    Lenient,
}

impl DisagreementThreshold {
    /// Largest number of distinct values that still counts as agreement
    pub fn max_distinct_values(self) -> usize {
        match self {
            DisagreementThreshold::Strict => 1,
            DisagreementThreshold::Lenient => 2,
        }
    }

    /// Parse a config value ("strict" / "lenient", any case)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(DisagreementThreshold::Strict),
            "lenient" => Some(DisagreementThreshold::Lenient),
            _ => None,
        }
    }
}

/// Normalization and consensus rules applied by a [`crate::store::TagStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagRules {
    pub threshold: DisagreementThreshold,
    pub boolean_literals: BooleanLiterals,
}

impl TagRules {
    /// Rules matching the earlier tagging tool
    pub fn legacy() -> Self {
        Self {
            threshold: DisagreementThreshold::Lenient,
            boolean_literals: BooleanLiterals::TrueOnly,
        }
    }
}

/// Consensus verdict for one image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsensusState {
    /// Fewer than two taggers
    Unknown,
    Agreement,
    Disagreement,
}

impl fmt::Display for ConsensusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConsensusState::Unknown => "unknown",
            ConsensusState::Agreement => "agreement",
            ConsensusState::Disagreement => "disagreement",
        };
        f.write_str(s)
    }
}

/// Count non-text values per tag across all taggers
pub fn summarize_by_tag<'a, I>(taggers: I) -> TagSummary
where
    I: IntoIterator<Item = (&'a String, &'a TagMap)>,
{
    let mut totals = TagSummary::new();

    for (_user_id, tags) in taggers {
        for (tag, value) in tags {
            if !is_comparable(value) {
                continue;
            }
            *totals
                .entry(tag.clone())
                .or_default()
                .entry(value.to_string())
                .or_insert(0) += 1;
        }
    }

    totals
}

/// Whether no tag in `summary` shows more distinct values than allowed
pub fn summary_agrees(summary: &TagSummary, threshold: DisagreementThreshold) -> bool {
    let limit = threshold.max_distinct_values();
    summary.values().all(|values| values.len() <= limit)
}

/// Tags whose distinct value count exceeds the threshold
pub fn disputed_tags(summary: &TagSummary, threshold: DisagreementThreshold) -> Vec<&str> {
    let limit = threshold.max_distinct_values();
    summary
        .iter()
        .filter(|(_, values)| values.len() > limit)
        .map(|(tag, _)| tag.as_str())
        .collect()
}

/// Whether a value takes part in consensus
pub fn is_comparable(value: &TagValue) -> bool {
    !value.is_text()
}
