//! In-memory tag store with one lock per image
//!
//! Images are independent: each sits behind its own `RwLock`, so users
//! tagging different images never contend, while writes to the same image are
//! serialized. Every read (summaries, consensus, snapshots) runs under that
//! image's lock and therefore sees one consistent state.
//!
//! Lock poisoning is recovered with `PoisonError::into_inner`: every mutation
//! is a single map insert, so a panicking holder cannot leave an image
//! half-written.

use crate::consensus::{ConsensusState, TagRules, TagSummary};
use crate::error::{TagError, TagResult};
use crate::models::{Image, ImageRecord, TagValue};
use psi_common::events::{EventBus, PsiEvent};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Shared handle to one image
pub type ImageHandle = Arc<RwLock<Image>>;

/// Registry of images keyed by original path
pub struct TagStore {
    images: RwLock<HashMap<String, ImageHandle>>,
    rules: TagRules,
    events: Option<EventBus>,
}

impl TagStore {
    pub fn new(rules: TagRules) -> Self {
        Self {
            images: RwLock::new(HashMap::new()),
            rules,
            events: None,
        }
    }

    /// Publish a [`PsiEvent::TagChanged`] for every mutation
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn rules(&self) -> TagRules {
        self.rules
    }

    /// Register a new image
    ///
    /// # Errors
    /// [`TagError::DuplicateImage`] if the original path is already known.
    pub fn register(&self, image: Image) -> TagResult<ImageHandle> {
        let key = image.key();
        let mut images = self.images.write().unwrap_or_else(PoisonError::into_inner);
        if images.contains_key(&key) {
            return Err(TagError::DuplicateImage(key));
        }

        let handle = Arc::new(RwLock::new(image));
        images.insert(key.clone(), Arc::clone(&handle));
        debug!(image = %key, "Registered image");
        Ok(handle)
    }

    /// Insert or replace an image (used when loading persisted state)
    pub fn insert(&self, image: Image) -> ImageHandle {
        let key = image.key();
        let handle = Arc::new(RwLock::new(image));
        self.images
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&handle));
        handle
    }

    pub fn get(&self, key: &str) -> TagResult<ImageHandle> {
        self.images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| TagError::UnknownImage(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.images.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered image keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Run `f` with shared access to one image
    pub fn with_image<T>(&self, key: &str, f: impl FnOnce(&Image) -> T) -> TagResult<T> {
        let handle = self.get(key)?;
        let image = read_lock(&handle);
        Ok(f(&image))
    }

    /// Run `f` with exclusive access to one image
    pub fn with_image_mut<T>(&self, key: &str, f: impl FnOnce(&mut Image) -> T) -> TagResult<T> {
        let handle = self.get(key)?;
        let mut image = write_lock(&handle);
        Ok(f(&mut image))
    }

    /// Add or update a tag from raw input; returns the stored value
    pub fn add_tag(&self, key: &str, user_id: &str, tag: &str, content: &str) -> TagResult<TagValue> {
        let literals = self.rules.boolean_literals;
        let value = self.with_image_mut(key, |image| {
            image.add_tag_with(user_id, tag, content, literals);
            image.tag(user_id, tag).cloned().unwrap_or(TagValue::Absent)
        })?;

        debug!(image = %key, user = %user_id, tag = %tag, kind = value.kind(), "Tag set");
        self.publish_tag_change(key, user_id, tag, Some(value.to_string()));
        Ok(value)
    }

    /// Same as [`TagStore::add_tag`]
    pub fn update_tag(&self, key: &str, user_id: &str, tag: &str, content: &str) -> TagResult<TagValue> {
        self.add_tag(key, user_id, tag, content)
    }

    pub fn remove_tag(&self, key: &str, user_id: &str, tag: &str) -> TagResult<()> {
        self.with_image_mut(key, |image| image.remove_tag(user_id, tag))?;

        debug!(image = %key, user = %user_id, tag = %tag, "Tag removed");
        self.publish_tag_change(key, user_id, tag, None);
        Ok(())
    }

    /// Record a skip; returns `false` if the user had already skipped
    pub fn skip(&self, key: &str, user_id: &str) -> TagResult<bool> {
        let added = self.with_image_mut(key, |image| image.skip(user_id))?;
        debug!(image = %key, user = %user_id, added, "Skip recorded");
        Ok(added)
    }

    /// Copy of the tagger ids at the time of the call
    pub fn tagger_ids(&self, key: &str) -> TagResult<BTreeSet<String>> {
        self.with_image(key, |image| image.tagger_ids().cloned().collect())
    }

    pub fn summarize(&self, key: &str) -> TagResult<TagSummary> {
        self.with_image(key, Image::summarize_by_tag)
    }

    /// Consensus under the store's threshold
    ///
    /// # Errors
    /// [`TagError::InsufficientTaggers`] with fewer than two taggers,
    /// [`TagError::UnknownImage`] for an unregistered key.
    pub fn all_taggers_agree(&self, key: &str) -> TagResult<bool> {
        let threshold = self.rules.threshold;
        self.with_image(key, |image| image.all_taggers_agree_with(threshold))?
    }

    pub fn consensus(&self, key: &str) -> TagResult<ConsensusState> {
        let threshold = self.rules.threshold;
        let state = self.with_image(key, |image| image.consensus(threshold))?;

        if let Some(events) = &self.events {
            events.emit_lossy(PsiEvent::ConsensusEvaluated {
                image: key.to_string(),
                state: state.to_string(),
                timestamp: psi_common::time::now(),
            });
        }
        Ok(state)
    }

    pub fn snapshot(&self, key: &str) -> TagResult<ImageRecord> {
        self.with_image(key, Image::snapshot)
    }

    /// Snapshots of every image, sorted by key
    ///
    /// Each image is copied under its own lock; images mutated after their
    /// copy was taken are not reflected.
    pub fn snapshots(&self) -> Vec<ImageRecord> {
        let handles: Vec<ImageHandle> = {
            let images = self.images.read().unwrap_or_else(PoisonError::into_inner);
            images.values().cloned().collect()
        };

        let mut records: Vec<ImageRecord> =
            handles.iter().map(|handle| read_lock(handle).snapshot()).collect();
        records.sort_by(|a, b| a.original_path.cmp(&b.original_path));
        records
    }

    fn publish_tag_change(&self, key: &str, user_id: &str, tag: &str, value: Option<String>) {
        if let Some(events) = &self.events {
            events.emit_lossy(PsiEvent::TagChanged {
                image: key.to_string(),
                user_id: user_id.to_string(),
                tag: tag.to_string(),
                value,
                timestamp: psi_common::time::now(),
            });
        }
    }
}

impl Default for TagStore {
    fn default() -> Self {
        Self::new(TagRules::default())
    }
}

fn read_lock(handle: &ImageHandle) -> RwLockReadGuard<'_, Image> {
    handle.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock(handle: &ImageHandle) -> RwLockWriteGuard<'_, Image> {
    handle.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::DisagreementThreshold;
    use crate::models::BooleanLiterals;

    const KEY: &str = "full/IMG_001.jpg";

    fn store_with_image(rules: TagRules) -> TagStore {
        let store = TagStore::new(rules);
        store.register(Image::new(KEY, "small/IMG_001.jpg")).unwrap();
        store
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let store = store_with_image(TagRules::default());
        let err = store.register(Image::new(KEY, "other.jpg")).unwrap_err();
        assert!(matches!(err, TagError::DuplicateImage(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_image() {
        let store = TagStore::default();
        let err = store.add_tag("nope.jpg", "alice", "damage", "true").unwrap_err();
        assert!(matches!(err, TagError::UnknownImage(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_applies_boolean_rules() {
        let store = store_with_image(TagRules {
            boolean_literals: BooleanLiterals::TrueOnly,
            ..TagRules::default()
        });
        let value = store.add_tag(KEY, "alice", "damage", "false").unwrap();
        assert_eq!(value, TagValue::Text("false".to_string()));
    }

    #[test]
    fn test_store_applies_threshold() {
        let strict = store_with_image(TagRules::default());
        let lenient = store_with_image(TagRules {
            threshold: DisagreementThreshold::Lenient,
            ..TagRules::default()
        });

        for store in [&strict, &lenient] {
            store.add_tag(KEY, "alice", "floors", "1").unwrap();
            store.add_tag(KEY, "bob", "floors", "2").unwrap();
        }

        assert!(!strict.all_taggers_agree(KEY).unwrap());
        assert!(lenient.all_taggers_agree(KEY).unwrap());
    }

    #[test]
    fn test_tagger_ids_is_a_copy() {
        let store = store_with_image(TagRules::default());
        store.add_tag(KEY, "alice", "damage", "true").unwrap();

        let ids = store.tagger_ids(KEY).unwrap();
        store.remove_tag(KEY, "bob", "damage").unwrap();

        assert_eq!(ids.len(), 1);
        assert_eq!(store.tagger_ids(KEY).unwrap().len(), 2);
    }

    #[test]
    fn test_events_published_for_mutations() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let store = store_with_image(TagRules::default()).with_events(bus);

        store.add_tag(KEY, "alice", "damage", "TRUE").unwrap();
        store.remove_tag(KEY, "alice", "damage").unwrap();

        match rx.try_recv().unwrap() {
            PsiEvent::TagChanged { value, .. } => assert_eq!(value.as_deref(), Some("true")),
            other => panic!("unexpected event {:?}", other),
        }
        match rx.try_recv().unwrap() {
            PsiEvent::TagChanged { value, .. } => assert_eq!(value, None),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_snapshots_sorted() {
        let store = TagStore::default();
        store.register(Image::new("b.jpg", "sb.jpg")).unwrap();
        store.register(Image::new("a.jpg", "sa.jpg")).unwrap();

        let keys: Vec<String> = store.snapshots().into_iter().map(|r| r.original_path).collect();
        assert_eq!(keys, vec!["a.jpg", "b.jpg"]);
        assert_eq!(store.keys(), vec!["a.jpg", "b.jpg"]);
    }
}
