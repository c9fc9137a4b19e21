//! Persistence of image tag state in SQLite

use psi_tagger::db::{self, images};
use psi_tagger::{BooleanLiterals, Image, TagError, TagRules, TagStore, TagValue};
use tempfile::TempDir;

#[tokio::test]
async fn test_init_creates_images_table() {
    let dir = TempDir::new().unwrap();
    let pool = db::init_database_pool(&dir.path().join("psi.db")).await.unwrap();

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='images'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 1);

    // second init is a no-op
    db::init_tables(&pool).await.unwrap();
}

#[tokio::test]
async fn test_save_and_load_keeps_types() {
    let dir = TempDir::new().unwrap();
    let pool = db::init_database_pool(&dir.path().join("psi.db")).await.unwrap();

    let mut image = Image::new("full/a.jpg", "small/a.jpg");
    image.add_tag("alice", "damage", "TRUE");
    image.add_tag("alice", "floors", "3");
    image.add_tag("alice", "notes", "leaning pole");
    image.remove_tag("bob", "damage");
    image.skip("carol");

    images::save_image(&pool, &image.snapshot()).await.unwrap();
    let loaded = images::load_image(&pool, "full/a.jpg").await.unwrap().unwrap();

    assert_eq!(Image::from_record(loaded), image);
    assert!(images::load_image(&pool, "full/missing.jpg").await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_overwrites_existing_row() {
    let dir = TempDir::new().unwrap();
    let pool = db::init_database_pool(&dir.path().join("psi.db")).await.unwrap();

    let mut image = Image::new("full/a.jpg", "small/a.jpg");
    image.add_tag("alice", "damage", "true");
    images::save_image(&pool, &image.snapshot()).await.unwrap();

    image.update_tag("alice", "damage", "false");
    images::save_image(&pool, &image.snapshot()).await.unwrap();

    let all = images::load_all(&pool).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].taggers["alice"]["damage"], TagValue::Boolean(false));
}

#[tokio::test]
async fn test_store_round_trip() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("psi.db");
    let pool = db::init_database_pool(&db_path).await.unwrap();

    let store = TagStore::new(TagRules::default());
    for name in ["b", "a"] {
        let key = format!("full/{}.jpg", name);
        store.register(Image::new(&key, format!("small/{}.jpg", name))).unwrap();
        store.add_tag(&key, "alice", "damage", "true").unwrap();
    }
    for record in store.snapshots() {
        images::save_image(&pool, &record).await.unwrap();
    }
    pool.close().await;

    let pool = db::init_database_pool(&db_path).await.unwrap();
    let reloaded = TagStore::default();
    assert_eq!(images::load_into_store(&pool, &reloaded).await.unwrap(), 2);
    assert_eq!(reloaded.snapshots(), store.snapshots());
}

#[tokio::test]
async fn test_insert_image_rejects_duplicate() {
    let dir = TempDir::new().unwrap();
    let pool = db::init_database_pool(&dir.path().join("psi.db")).await.unwrap();

    let image = Image::new("full/a.jpg", "small/a.jpg");
    images::insert_image(&pool, &image).await.unwrap();

    let err = images::insert_image(&pool, &image).await.unwrap_err();
    assert!(matches!(err, TagError::DuplicateImage(_)));
}

#[tokio::test]
async fn test_update_unknown_image_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let pool = db::init_database_pool(&dir.path().join("psi.db")).await.unwrap();

    let err = images::update_image(&pool, "full/missing.jpg", |img| img.skip("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, TagError::UnknownImage(_)));
    assert!(images::load_all(&pool).await.unwrap().is_empty());

    // the connection went back to the pool without an open transaction
    images::insert_image(&pool, &Image::new("full/a.jpg", "small/a.jpg")).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_taggers_on_separate_connections_both_persist() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("psi.db");

    // one pool per command-line process
    let first = db::init_database_pool(&db_path).await.unwrap();
    let second = db::init_database_pool(&db_path).await.unwrap();
    images::insert_image(&first, &Image::new("full/a.jpg", "small/a.jpg")).await.unwrap();

    let tag = |user: &'static str| {
        move |img: &mut Image| img.add_tag_with(user, "damage", "true", BooleanLiterals::default())
    };
    let (alice, bob) = tokio::join!(
        images::update_image(&first, "full/a.jpg", tag("alice")),
        images::update_image(&second, "full/a.jpg", tag("bob")),
    );
    alice.unwrap();
    bob.unwrap();

    let record = images::load_image(&first, "full/a.jpg").await.unwrap().unwrap();
    let taggers: Vec<&String> = record.taggers.keys().collect();
    assert_eq!(taggers.len(), 2, "taggers after concurrent updates: {:?}", taggers);
    assert_eq!(record.taggers["alice"]["damage"], TagValue::Boolean(true));
    assert_eq!(record.taggers["bob"]["damage"], TagValue::Boolean(true));
}

#[tokio::test]
async fn test_sequential_updates_see_committed_state() {
    let dir = TempDir::new().unwrap();
    let pool = db::init_database_pool(&dir.path().join("psi.db")).await.unwrap();
    images::insert_image(&pool, &Image::new("full/a.jpg", "small/a.jpg")).await.unwrap();

    let added = images::update_image(&pool, "full/a.jpg", |img| img.skip("carol")).await.unwrap();
    assert!(added);
    let added_again = images::update_image(&pool, "full/a.jpg", |img| img.skip("carol")).await.unwrap();
    assert!(!added_again);

    images::update_image(&pool, "full/a.jpg", |img| img.remove_tag("bob", "damage"))
        .await
        .unwrap();
    let record = images::load_image(&pool, "full/a.jpg").await.unwrap().unwrap();
    assert_eq!(record.taggers["bob"]["damage"], TagValue::Absent);
    assert_eq!(record.skippers.len(), 1);
}
