//! Integration tests for `taskchain`.

use chrono::NaiveDate;
use taskchain::config::TrackerConfig;
use taskchain::tasks::{
    ListRequest, Priority, Repeats, SequenceManager, SortKey, SortOrder, SqliteTaskStore,
    TaskDraft,
};
use taskchain::VERSION;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_version_exists() {
    assert!(!VERSION.is_empty());
}

#[test]
fn test_config_drives_store_location() {
    let dir = TempDir::new().unwrap();
    let config = TrackerConfig {
        database_path: Some(dir.path().join("tracker.db")),
        default_page_size: 10,
    };
    config.save_to(dir.path()).unwrap();

    let loaded = TrackerConfig::load_from(dir.path()).unwrap().unwrap();
    let store = SqliteTaskStore::new(loaded.database_path()).unwrap();
    let manager = SequenceManager::new(store);

    let draft = TaskDraft::new("Take out bins", Priority::Low, "Green bin week", "2024-01-10");
    let task = manager.create(&draft).unwrap();
    assert_eq!(manager.get_by_id(task.id).unwrap().name, "Take out bins");
}

#[test]
fn test_recurring_lifecycle_end_to_end() {
    let dir = TempDir::new().unwrap();
    let store = SqliteTaskStore::new(dir.path().join("tasks.db")).unwrap();
    let manager = SequenceManager::new(store);

    // Create a daily chain of three occurrences.
    let draft = TaskDraft::new("Stretch", Priority::Medium, "Ten minutes", "2024-01-10")
        .repeating(Repeats::Daily, 3);
    let head = manager.create(&draft).unwrap();
    assert_eq!(manager.get_all().unwrap().len(), 3);

    // Complete the head; its successors stay pending.
    let completion =
        TaskDraft { date_completed: Some("2024-01-10".to_string()), ..TaskDraft::default() };
    let head = manager.complete(head.id, &completion).unwrap();
    assert!(head.is_complete);

    let pending = manager
        .store()
        .list_as_of(&ListRequest::pending(), date(2024, 1, 10))
        .unwrap();
    assert_eq!(pending.total, 2);

    // The second occurrence is due tomorrow from the head's perspective.
    let tomorrow = manager
        .store()
        .list_as_of(&ListRequest::pending().with_filter("tomorrow"), date(2024, 1, 10))
        .unwrap();
    assert_eq!(tomorrow.total, 1);
    assert_eq!(tomorrow.tasks[0].due_date, date(2024, 1, 11));

    // Delete the middle occurrence; the chain is spliced.
    let second_id = tomorrow.tasks[0].id;
    manager.delete(second_id).unwrap();
    let head = manager.get_by_id(head.id).unwrap();
    let tail = manager.get_by_id(head.next_id.unwrap()).unwrap();
    assert_eq!(tail.due_date, date(2024, 1, 12));
    assert!(tail.next_id.is_none());
}

#[test]
fn test_filter_precedence_overdue_beats_literal_text() {
    let dir = TempDir::new().unwrap();
    let store = SqliteTaskStore::new(dir.path().join("tasks.db")).unwrap();
    let manager = SequenceManager::new(store);

    manager
        .create(&TaskDraft::new(
            "Write report",
            Priority::High,
            "This one is long overdue",
            "2024-01-10",
        ))
        .unwrap();
    manager
        .create(&TaskDraft::new("Old chore", Priority::Low, "Slipped", "2024-01-05"))
        .unwrap();

    // Both tasks are pending; only the one due strictly before today counts
    // as overdue, not the one whose description contains the word.
    let page = manager
        .store()
        .list_as_of(&ListRequest::pending().with_filter("overdue"), date(2024, 1, 10))
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.tasks[0].name, "Old chore");
}

#[test]
fn test_paged_listing_with_total() {
    let dir = TempDir::new().unwrap();
    let store = SqliteTaskStore::new(dir.path().join("tasks.db")).unwrap();
    let manager = SequenceManager::new(store);

    let draft = TaskDraft::new("Practice piano", Priority::Medium, "Scales", "2024-03-01")
        .repeating(Repeats::Daily, 7);
    manager.create(&draft).unwrap();

    let request = ListRequest::pending()
        .sorted_by(SortKey::DueDate, SortOrder::Asc)
        .page(2, 3);
    let page = manager.list(&request).unwrap();

    assert_eq!(page.total, 7);
    assert_eq!(page.tasks.len(), 1);
    assert_eq!(page.tasks[0].due_date, date(2024, 3, 7));
}
