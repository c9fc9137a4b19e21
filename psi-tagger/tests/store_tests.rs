//! TagStore behaviour under concurrent use

use std::sync::Arc;
use std::thread;

use psi_tagger::{ConsensusState, Image, TagRules, TagStore, TagValue};

const KEY: &str = "michael/full/IMG_7.jpg";

fn store() -> Arc<TagStore> {
    let store = TagStore::new(TagRules::default());
    store.register(Image::new(KEY, "michael/small/IMG_7.jpg")).unwrap();
    Arc::new(store)
}

#[test]
fn test_concurrent_users_on_one_image() {
    let store = store();

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let user = format!("user{}", n);
                for i in 0..50 {
                    store.add_tag(KEY, &user, &format!("tag{}", i % 5), "true").unwrap();
                    // readers must never observe a torn state
                    let summary = store.summarize(KEY).unwrap();
                    assert!(summary.values().all(|values| values.len() == 1));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.tagger_ids(KEY).unwrap().len(), 8);
    assert_eq!(store.summarize(KEY).unwrap()["tag0"]["true"], 8);
    assert_eq!(store.consensus(KEY).unwrap(), ConsensusState::Agreement);
}

#[test]
fn test_concurrent_writes_to_same_tag_keep_one_value() {
    let store = store();

    let handles: Vec<_> = ["1", "2"]
        .into_iter()
        .map(|value| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..100 {
                    store.update_tag(KEY, "alice", "floors", value).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let value = store.with_image(KEY, |img| img.tag("alice", "floors").cloned()).unwrap();
    assert!(matches!(value, Some(TagValue::Integer(1)) | Some(TagValue::Integer(2))));
    assert_eq!(store.snapshot(KEY).unwrap().taggers["alice"].len(), 1);
}

#[test]
fn test_concurrent_registration_of_distinct_images() {
    let store = Arc::new(TagStore::default());

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .register(Image::new(format!("full/{}.jpg", n), format!("small/{}.jpg", n)))
                    .unwrap();
                store.skip(&format!("full/{}.jpg", n), "carol").unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(store.len(), 4);
    assert_eq!(store.snapshots().len(), 4);
}
