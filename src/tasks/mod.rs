//! Recurring-task engine.
//!
//! This module provides the server-side core of a personal task tracker:
//! - Tasks with name, priority, description, and calendar due date
//! - Repeating tasks materialized as a chain of occurrences linked by
//!   `next_id`, kept consistent under later edits
//! - Completion and deletion of individual occurrences
//! - A query engine answering filtered, sorted, paged list requests with
//!   a total count
//!
//! # Example
//!
//! ```no_run
//! use taskchain::tasks::{
//!     ListRequest, Priority, Repeats, SequenceManager, SqliteTaskStore, TaskDraft,
//! };
//!
//! let store = SqliteTaskStore::new("/tmp/tasks.db").unwrap();
//! let manager = SequenceManager::new(store);
//!
//! // A daily task due three days in a row.
//! let draft = TaskDraft::new("Water plants", Priority::Low, "Balcony only", "2024-01-10")
//!     .repeating(Repeats::Daily, 3);
//! let head = manager.create(&draft).unwrap();
//!
//! // Everything still pending and overdue.
//! let page = manager.list(&ListRequest::pending().with_filter("overdue")).unwrap();
//! println!("{} overdue tasks", page.total);
//! # let _ = head;
//! ```

pub mod models;
pub mod query;
pub mod sequence;
pub mod store;

pub use models::{
    parse_input_date, InvalidPriority, InvalidRepeats, Priority, Repeats, Task, TaskDraft,
    TaskId,
};
pub use query::{Filter, ListRequest, SortKey, SortOrder, TaskPage};
pub use sequence::SequenceManager;
pub use store::{AuditEntry, SqliteTaskStore, TaskStore, TxnStore};
