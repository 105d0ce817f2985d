use chrono::{NaiveDate, TimeZone, Utc};
use dream_journal::dream_entry::{DreamDraft, Mood};
use dream_journal::dream_state::{storage_key, DreamStore, StoreError, DEFAULT_KEY};
use dream_journal::storage::{BlobStorage, FileStorage};
use tempfile::TempDir;

fn flying_draft() -> DreamDraft {
    DreamDraft {
        title: "Flying".into(),
        description: "I flew over a city".into(),
        date: "2024-01-01".into(),
        mood: Mood::Excited,
        tags: "flying, city".into(),
    }
}

#[test]
fn create_update_remove_scenario() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::open(dir.path()).unwrap();
    let mut store = DreamStore::load(storage, DEFAULT_KEY);

    let created = store.create(flying_draft().validate().unwrap()).unwrap();
    let listed = store.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].tags, ["flying", "city"]);
    assert_eq!(listed[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

    let mut draft = DreamDraft::from_entry(&created);
    draft.mood = Mood::Peaceful;
    store.update(created.id, draft.validate().unwrap()).unwrap();
    assert_eq!(store.list()[0].mood, Mood::Peaceful);
    assert_eq!(store.list()[0].id, created.id);

    store.remove(created.id).unwrap();
    assert!(store.list().is_empty());
    store.remove(created.id).unwrap();
    assert!(store.list().is_empty());
}

#[test]
fn journal_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap();

    let original = {
        let storage = FileStorage::open(dir.path()).unwrap();
        let mut store = DreamStore::load(storage, DEFAULT_KEY);
        let mut draft = flying_draft();
        draft.tags = "flying,  water ,  , family".into();
        store.create_at(draft.validate().unwrap(), now).unwrap();
        let mut second = flying_draft();
        second.title = "Falling".into();
        store.create_at(second.validate().unwrap(), now).unwrap();
        store.entries().to_vec()
    };

    let storage = FileStorage::open(dir.path()).unwrap();
    let reopened = DreamStore::load(storage, DEFAULT_KEY);
    assert_eq!(reopened.entries(), original.as_slice());
    assert_eq!(reopened.entries()[0].tags, ["flying", "water", "family"]);
    assert_ne!(reopened.entries()[0].id, reopened.entries()[1].id);

    let stats = reopened.stats(now);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.this_week, 2);
}

#[test]
fn persisted_layout_is_a_plain_array() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::open(dir.path()).unwrap();
    let mut store = DreamStore::load(&storage, DEFAULT_KEY);
    let entry = store.create(flying_draft().validate().unwrap()).unwrap();

    let raw = storage.read(DEFAULT_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        value,
        serde_json::json!([{
            "id": entry.id,
            "title": "Flying",
            "description": "I flew over a city",
            "date": "2024-01-01",
            "mood": "excited",
            "tags": ["flying", "city"],
        }])
    );
}

#[test]
fn corrupted_file_falls_back_to_empty_and_is_replaced_on_write() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("dreams.json"), b"\x00\x01 not json").unwrap();
    let storage = FileStorage::open(dir.path()).unwrap();

    let mut store = DreamStore::load(&storage, DEFAULT_KEY);
    assert!(store.entries().is_empty());
    assert!(matches!(
        store.update(1, flying_draft().validate().unwrap()),
        Err(StoreError::NotFound(1))
    ));

    store.create(flying_draft().validate().unwrap()).unwrap();
    let reloaded = DreamStore::load(&storage, DEFAULT_KEY);
    assert_eq!(reloaded.entries().len(), 1);
}

#[test]
fn isolated_users_do_not_see_each_other() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::open(dir.path()).unwrap();

    let mut ada = DreamStore::load(&storage, storage_key(Some("ada@example.com")));
    ada.create(flying_draft().validate().unwrap()).unwrap();

    let bob = DreamStore::load(&storage, storage_key(Some("bob@example.com")));
    assert!(bob.entries().is_empty());
    let shared = DreamStore::load(&storage, storage_key(None));
    assert!(shared.entries().is_empty());
}
