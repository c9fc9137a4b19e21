//! Image model: per-user tag maps and skips for one extracted picture

use crate::consensus::{self, ConsensusState, DisagreementThreshold, TagSummary};
use crate::error::{TagError, TagResult};
use crate::models::{BooleanLiterals, TagValue};
use serde::{Deserialize, Serialize};
use std::collections::{hash_map, BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

/// One user's tags: tag name → value
pub type TagMap = HashMap<String, TagValue>;

/// An image extracted from an archive, plus everything users said about it
///
/// `taggers` gains an entry for a user the first time that user adds,
/// updates or removes any tag, and never loses it: a removal writes
/// [`TagValue::Absent`] instead of deleting.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Full-size rendition, relative to the archive extraction root
    pub original_path: PathBuf,
    /// Reduced-size rendition, relative to the archive extraction root
    pub small_path: PathBuf,
    skippers: BTreeSet<String>,
    taggers: HashMap<String, TagMap>,
}

impl Image {
    pub fn new(original_path: impl Into<PathBuf>, small_path: impl Into<PathBuf>) -> Self {
        Self {
            original_path: original_path.into(),
            small_path: small_path.into(),
            skippers: BTreeSet::new(),
            taggers: HashMap::new(),
        }
    }

    /// Identity of the image in stores and on disk
    pub fn key(&self) -> String {
        self.original_path.to_string_lossy().into_owned()
    }

    /// Ids of users who have tagged this image (live view)
    pub fn tagger_ids(&self) -> hash_map::Keys<'_, String, TagMap> {
        self.taggers.keys()
    }

    pub fn tagger_count(&self) -> usize {
        self.taggers.len()
    }

    /// All tags of one user, if that user ever touched this image
    pub fn tags_of(&self, user_id: &str) -> Option<&TagMap> {
        self.taggers.get(user_id)
    }

    /// One user's current value for one tag
    pub fn tag(&self, user_id: &str, tag: &str) -> Option<&TagValue> {
        self.taggers.get(user_id).and_then(|tags| tags.get(tag))
    }

    /// Add or overwrite a tag from raw user input
    pub fn add_tag(&mut self, user_id: &str, tag: &str, content: &str) {
        self.add_tag_with(user_id, tag, content, BooleanLiterals::default());
    }

    /// Same as [`Image::add_tag`]
    pub fn update_tag(&mut self, user_id: &str, tag: &str, content: &str) {
        self.add_tag(user_id, tag, content);
    }

    /// Add or overwrite a tag, reading booleans with `literals`
    pub fn add_tag_with(
        &mut self,
        user_id: &str,
        tag: &str,
        content: &str,
        literals: BooleanLiterals,
    ) {
        self.set_tag(user_id, tag, TagValue::normalize_with(content, literals));
    }

    /// Store an already-typed value
    pub fn set_tag(&mut self, user_id: &str, tag: &str, value: TagValue) {
        self.taggers
            .entry(user_id.to_string())
            .or_default()
            .insert(tag.to_string(), value);
    }

    /// Mark a tag as removed for this user; records the user as a tagger
    pub fn remove_tag(&mut self, user_id: &str, tag: &str) {
        self.set_tag(user_id, tag, TagValue::Absent);
    }

    /// Record that a user declined to tag this image
    ///
    /// Returns `false` if the user had already skipped it.
    pub fn skip(&mut self, user_id: &str) -> bool {
        self.skippers.insert(user_id.to_string())
    }

    pub fn has_skipped(&self, user_id: &str) -> bool {
        self.skippers.contains(user_id)
    }

    pub fn skippers(&self) -> impl Iterator<Item = &str> + '_ {
        self.skippers.iter().map(String::as_str)
    }

    pub fn skip_count(&self) -> usize {
        self.skippers.len()
    }

    /// Per tag, how many users chose each non-text value
    pub fn summarize_by_tag(&self) -> TagSummary {
        consensus::summarize_by_tag(&self.taggers)
    }

    /// Whether all taggers agree on every non-text tag (strict threshold)
    ///
    /// # Errors
    /// [`TagError::InsufficientTaggers`] with fewer than two taggers.
    pub fn all_taggers_agree(&self) -> TagResult<bool> {
        self.all_taggers_agree_with(DisagreementThreshold::Strict)
    }

    /// Whether all taggers agree, with an explicit threshold
    pub fn all_taggers_agree_with(&self, threshold: DisagreementThreshold) -> TagResult<bool> {
        let found = self.tagger_count();
        if found < 2 {
            return Err(TagError::InsufficientTaggers { found });
        }

        Ok(consensus::summary_agrees(&self.summarize_by_tag(), threshold))
    }

    /// Consensus verdict; never fails
    pub fn consensus(&self, threshold: DisagreementThreshold) -> ConsensusState {
        match self.all_taggers_agree_with(threshold) {
            Ok(true) => ConsensusState::Agreement,
            Ok(false) => ConsensusState::Disagreement,
            Err(_) => ConsensusState::Unknown,
        }
    }

    /// Copy with both paths resolved against `scope_path`
    ///
    /// Both renditions must exist; the result holds canonical absolute paths.
    pub fn expanded(&self, scope_path: &Path) -> TagResult<Image> {
        let mut copy = self.clone();
        copy.original_path = expand_path(scope_path, &self.original_path)?;
        copy.small_path = expand_path(scope_path, &self.small_path)?;
        Ok(copy)
    }

    /// Owned, ordered copy of the full state for persistence
    pub fn snapshot(&self) -> ImageRecord {
        ImageRecord {
            original_path: self.key(),
            small_path: self.small_path.to_string_lossy().into_owned(),
            skippers: self.skippers.clone(),
            taggers: self
                .taggers
                .iter()
                .map(|(user, tags)| {
                    let tags = tags
                        .iter()
                        .map(|(tag, value)| (tag.clone(), value.clone()))
                        .collect();
                    (user.clone(), tags)
                })
                .collect(),
        }
    }

    /// Rebuild an image from a persisted snapshot
    pub fn from_record(record: ImageRecord) -> Self {
        Self {
            original_path: PathBuf::from(record.original_path),
            small_path: PathBuf::from(record.small_path),
            skippers: record.skippers,
            taggers: record
                .taggers
                .into_iter()
                .map(|(user, tags)| (user, tags.into_iter().collect()))
                .collect(),
        }
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original_path.display())
    }
}

/// Persisted form of an [`Image`]
///
/// Ordered maps keep the JSON stable between saves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub original_path: String,
    pub small_path: String,
    #[serde(default)]
    pub skippers: BTreeSet<String>,
    #[serde(default)]
    pub taggers: BTreeMap<String, BTreeMap<String, TagValue>>,
}

fn expand_path(scope_path: &Path, relative: &Path) -> TagResult<PathBuf> {
    let joined = scope_path.join(relative);
    joined
        .canonicalize()
        .map_err(|_| TagError::PathNotFound(joined))
}
