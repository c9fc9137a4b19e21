//! Consensus scenarios over a single image

use psi_tagger::consensus::DisagreementThreshold;
use psi_tagger::{ConsensusState, Image, TagError, TagValue};

fn image() -> Image {
    Image::new("florence/full/IMG_0042.jpg", "florence/small/IMG_0042.jpg")
}

#[test]
fn test_two_taggers_same_boolean_agree() {
    let mut img = image();
    img.add_tag("alice", "damage", "TRUE");
    img.add_tag("bob", "damage", "true");

    assert!(img.all_taggers_agree().unwrap());
    assert_eq!(img.summarize_by_tag()["damage"]["true"], 2);
}

#[test]
fn test_conflicting_booleans_disagree() {
    let mut img = image();
    img.add_tag("alice", "damage", "TRUE");
    img.add_tag("bob", "damage", "FALSE");

    assert!(!img.all_taggers_agree().unwrap());
    assert_eq!(
        img.consensus(DisagreementThreshold::Strict),
        ConsensusState::Disagreement
    );
    // the earlier tool tolerated two distinct values
    assert!(img.all_taggers_agree_with(DisagreementThreshold::Lenient).unwrap());
}

#[test]
fn test_free_text_never_blocks_agreement() {
    let mut img = image();
    img.add_tag("alice", "notes", "leaning pole");
    img.add_tag("bob", "notes", "roof intact");

    assert!(img.all_taggers_agree().unwrap());
    assert!(img.summarize_by_tag().is_empty());
}

#[test]
fn test_removal_counts_as_a_distinct_value() {
    let mut img = image();
    img.add_tag("alice", "flooded", "true");
    img.add_tag("bob", "flooded", "true");
    img.remove_tag("bob", "flooded");

    let summary = img.summarize_by_tag();
    assert_eq!(summary["flooded"]["true"], 1);
    assert_eq!(summary["flooded"]["removed"], 1);
    assert!(!img.all_taggers_agree().unwrap());
}

#[test]
fn test_update_flips_verdict() {
    let mut img = image();
    img.add_tag("alice", "floors", "2");
    img.add_tag("bob", "floors", "3");
    assert!(!img.all_taggers_agree().unwrap());

    img.update_tag("bob", "floors", "2");
    assert!(img.all_taggers_agree().unwrap());
    assert_eq!(img.tag("bob", "floors"), Some(&TagValue::Integer(2)));
}

#[test]
fn test_integer_and_text_with_same_digits_differ() {
    let mut img = image();
    img.add_tag("alice", "floors", "2");
    img.add_tag("bob", "floors", "2 floors");

    // text is ignored, so only one comparable value remains
    assert!(img.all_taggers_agree().unwrap());
    assert_eq!(img.summarize_by_tag()["floors"].len(), 1);
}

#[test]
fn test_no_taggers_is_insufficient() {
    let img = image();
    match img.all_taggers_agree() {
        Err(TagError::InsufficientTaggers { found }) => assert_eq!(found, 0),
        other => panic!("expected InsufficientTaggers, got {:?}", other),
    }
}

#[test]
fn test_single_tagger_is_insufficient() {
    let mut img = image();
    img.add_tag("alice", "damage", "true");
    img.add_tag("alice", "floors", "1");

    let err = img.all_taggers_agree().unwrap_err();
    assert!(err.is_insufficient_taggers());
    assert_eq!(img.consensus(DisagreementThreshold::Strict), ConsensusState::Unknown);
}

#[test]
fn test_remove_only_user_still_counts_as_tagger() {
    let mut img = image();
    img.add_tag("alice", "damage", "true");
    img.remove_tag("bob", "damage");

    assert_eq!(img.tagger_count(), 2);
    assert!(!img.all_taggers_agree().unwrap());
}

#[test]
fn test_disagreement_on_one_tag_is_enough() {
    let mut img = image();
    for user in ["alice", "bob", "carol"] {
        img.add_tag(user, "damage", "true");
        img.add_tag(user, "notes", user);
    }
    assert!(img.all_taggers_agree().unwrap());

    img.add_tag("carol", "floors", "4");
    img.add_tag("alice", "floors", "5");
    assert!(!img.all_taggers_agree().unwrap());
}
