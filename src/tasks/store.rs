//! Task store trait and `SQLite` implementation.
//!
//! Two implementations share the same row-level code: [`SqliteTaskStore`]
//! runs each call on its own autocommit connection, and [`TxnStore`] is a
//! transaction-scoped view handed out by [`SqliteTaskStore::transaction`] so
//! chain materialization commits or rolls back as a unit.
//!
//! Every write checks and increments the row's `version` column; a stale
//! write surfaces as [`Error::Conflict`] instead of silently interleaving
//! with a concurrent chain mutation.

use crate::error::{Error, Result};
use crate::tasks::models::{Priority, Repeats, Task, TaskId};
use crate::tasks::query::{self, ListRequest, TaskPage};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Trait for task storage operations.
///
/// All methods return a `Result` and may fail with database errors.
#[allow(clippy::missing_errors_doc)]
pub trait TaskStore {
    /// Get a task by id.
    fn find_by_id(&self, id: TaskId) -> Result<Option<Task>>;

    /// Insert a new task, ignoring `task.id`, and return the stored row.
    fn insert(&self, task: &Task) -> Result<Task>;

    /// Write every field of `task` back to its row and return the stored
    /// row with its version incremented.
    ///
    /// Fails with [`Error::Conflict`] if the row's version no longer matches
    /// `task.version`, and [`Error::NotFound`] if the row is gone.
    fn update(&self, task: &Task) -> Result<Task>;

    /// Delete a task by id. Returns false if it did not exist.
    fn delete(&self, id: TaskId) -> Result<bool>;

    /// Find the occurrence whose `next_id` points at the given task.
    fn predecessor_of(&self, id: TaskId) -> Result<Option<Task>>;

    /// All tasks, ordered by id.
    fn all(&self) -> Result<Vec<Task>>;

    /// Delete every task. Returns the number of rows removed.
    fn delete_all(&self) -> Result<usize>;

    /// Run a list request against the current UTC calendar day.
    fn list(&self, request: &ListRequest) -> Result<TaskPage>;
}

/// An entry in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier for the entry.
    pub id: i64,
    /// ISO 8601 timestamp when the operation occurred.
    pub timestamp: String,
    /// Type of operation (e.g. "create", "update", "delete").
    pub operation: String,
    /// Id of the affected task, if applicable.
    pub task_id: Option<TaskId>,
    /// Previous row state, JSON serialized.
    pub old_value: Option<String>,
    /// New row state, JSON serialized.
    pub new_value: Option<String>,
}

/// SQLite-based task store.
#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    db_path: PathBuf,
}

impl SqliteTaskStore {
    /// Create a new `SQLite` task store at the given database path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self { db_path: db_path.as_ref().to_path_buf() };
        store.init_schema()?;
        Ok(store)
    }

    /// Get the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a connection to the database.
    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        Ok(conn)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                priority TEXT NOT NULL
                    CHECK (priority IN ('Low', 'Medium', 'High', 'Urgent')),
                description TEXT NOT NULL,
                due_date TEXT NOT NULL,
                date_completed TEXT,
                is_complete INTEGER NOT NULL DEFAULT 0,
                repeats TEXT NOT NULL DEFAULT 'noRepeat'
                    CHECK (repeats IN ('noRepeat', 'daily', 'weekly', 'monthly', 'yearly')),
                ends_after INTEGER NOT NULL DEFAULT 0,
                next_id INTEGER REFERENCES tasks(id) ON DELETE SET NULL,
                version INTEGER NOT NULL DEFAULT 0
            );

            -- Indexes for the common list predicates
            CREATE INDEX IF NOT EXISTS idx_tasks_is_complete ON tasks(is_complete);
            CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(due_date);
            CREATE INDEX IF NOT EXISTS idx_tasks_next_id ON tasks(next_id);

            -- Immutable audit log
            CREATE TABLE IF NOT EXISTS task_audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL DEFAULT (datetime('now')),
                operation TEXT NOT NULL,
                task_id INTEGER,
                old_value TEXT,
                new_value TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_task_audit_task_id ON task_audit_log(task_id);
            ",
        )?;

        Ok(())
    }

    /// Run `f` inside a single transaction.
    ///
    /// If `f` returns an error the transaction is rolled back and no write
    /// inside it survives, which is what keeps a half-materialized chain
    /// from ever being observable.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a database error from commit.
    pub fn transaction<T>(&self, f: impl FnOnce(&TxnStore<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        let value = f(&TxnStore { conn: &tx })?;
        tx.commit()?;
        Ok(value)
    }

    /// Run a list request as of a fixed calendar day.
    ///
    /// [`TaskStore::list`] uses the current UTC day; this variant exists so
    /// the `overdue` / `today` / `tomorrow` filters can be exercised
    /// deterministically.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure or an invalid request.
    pub fn list_as_of(&self, request: &ListRequest, today: NaiveDate) -> Result<TaskPage> {
        let conn = self.open()?;
        run_list(&conn, request, today)
    }

    /// Get audit log entries, newest first, optionally filtered by task id.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn audit_log(
        &self,
        task_id: Option<TaskId>,
        limit: Option<usize>,
    ) -> Result<Vec<AuditEntry>> {
        let conn = self.open()?;

        let mut sql = String::from(
            "SELECT id, timestamp, operation, task_id, old_value, new_value
             FROM task_audit_log",
        );
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(id) = task_id {
            sql.push_str(" WHERE task_id = ?");
            params_vec.push(Box::new(id));
        }
        sql.push_str(" ORDER BY id DESC");
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            params_vec.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(AsRef::as_ref).collect();
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_refs.as_slice(), |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    operation: row.get(2)?,
                    task_id: row.get(3)?,
                    old_value: row.get(4)?,
                    new_value: row.get(5)?,
                })
            })?
            .flatten()
            .collect();

        Ok(entries)
    }
}

impl TaskStore for SqliteTaskStore {
    fn find_by_id(&self, id: TaskId) -> Result<Option<Task>> {
        find_task(&self.open()?, id)
    }

    fn insert(&self, task: &Task) -> Result<Task> {
        insert_task(&self.open()?, task)
    }

    fn update(&self, task: &Task) -> Result<Task> {
        update_task(&self.open()?, task)
    }

    fn delete(&self, id: TaskId) -> Result<bool> {
        delete_task(&self.open()?, id)
    }

    fn predecessor_of(&self, id: TaskId) -> Result<Option<Task>> {
        find_predecessor(&self.open()?, id)
    }

    fn all(&self) -> Result<Vec<Task>> {
        all_tasks(&self.open()?)
    }

    fn delete_all(&self) -> Result<usize> {
        delete_all_tasks(&self.open()?)
    }

    fn list(&self, request: &ListRequest) -> Result<TaskPage> {
        let conn = self.open()?;
        run_list(&conn, request, Utc::now().date_naive())
    }
}

/// Transaction-scoped view of the store.
///
/// Created by [`SqliteTaskStore::transaction`]; every operation runs on the
/// enclosing transaction's connection.
pub struct TxnStore<'c> {
    conn: &'c Connection,
}

impl TaskStore for TxnStore<'_> {
    fn find_by_id(&self, id: TaskId) -> Result<Option<Task>> {
        find_task(self.conn, id)
    }

    fn insert(&self, task: &Task) -> Result<Task> {
        insert_task(self.conn, task)
    }

    fn update(&self, task: &Task) -> Result<Task> {
        update_task(self.conn, task)
    }

    fn delete(&self, id: TaskId) -> Result<bool> {
        delete_task(self.conn, id)
    }

    fn predecessor_of(&self, id: TaskId) -> Result<Option<Task>> {
        find_predecessor(self.conn, id)
    }

    fn all(&self) -> Result<Vec<Task>> {
        all_tasks(self.conn)
    }

    fn delete_all(&self) -> Result<usize> {
        delete_all_tasks(self.conn)
    }

    fn list(&self, request: &ListRequest) -> Result<TaskPage> {
        run_list(self.conn, request, Utc::now().date_naive())
    }
}

const TASK_COLUMNS: &str =
    "id, name, priority, description, due_date, date_completed, is_complete, repeats, \
     ends_after, next_id, version";

/// Parse a task from a row.
fn parse_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let priority_str: String = row.get(2)?;
    let priority = Priority::from_str(&priority_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let repeats_str: String = row.get(7)?;
    let repeats = Repeats::from_str(&repeats_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Task {
        id: row.get(0)?,
        name: row.get(1)?,
        priority,
        description: row.get(3)?,
        due_date: row.get(4)?,
        date_completed: row.get(5)?,
        is_complete: row.get(6)?,
        repeats,
        ends_after: row.get(8)?,
        next_id: row.get(9)?,
        version: row.get(10)?,
    })
}

fn find_task(conn: &Connection, id: TaskId) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            params![id],
            parse_task,
        )
        .optional()?;
    Ok(task)
}

fn insert_task(conn: &Connection, task: &Task) -> Result<Task> {
    conn.execute(
        "INSERT INTO tasks (name, priority, description, due_date, date_completed,
                            is_complete, repeats, ends_after, next_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            task.name,
            task.priority.as_str(),
            task.description,
            task.due_date,
            task.date_completed,
            task.is_complete,
            task.repeats.as_str(),
            task.ends_after,
            task.next_id,
        ],
    )?;

    let id = conn.last_insert_rowid();
    let stored = find_task(conn, id)?.ok_or(Error::NotFound(id))?;
    log_audit(conn, "create", Some(id), None, Some(&stored))?;
    Ok(stored)
}

fn update_task(conn: &Connection, task: &Task) -> Result<Task> {
    let old = find_task(conn, task.id)?.ok_or(Error::NotFound(task.id))?;

    let rows = conn.execute(
        "UPDATE tasks SET name = ?1, priority = ?2, description = ?3, due_date = ?4,
                date_completed = ?5, is_complete = ?6, repeats = ?7, ends_after = ?8,
                next_id = ?9, version = version + 1
         WHERE id = ?10 AND version = ?11",
        params![
            task.name,
            task.priority.as_str(),
            task.description,
            task.due_date,
            task.date_completed,
            task.is_complete,
            task.repeats.as_str(),
            task.ends_after,
            task.next_id,
            task.id,
            task.version,
        ],
    )?;

    if rows == 0 {
        // Row exists but the version moved underneath us.
        return Err(Error::Conflict(task.id));
    }

    let stored = find_task(conn, task.id)?.ok_or(Error::NotFound(task.id))?;
    log_audit(conn, "update", Some(task.id), Some(&old), Some(&stored))?;
    Ok(stored)
}

fn delete_task(conn: &Connection, id: TaskId) -> Result<bool> {
    let Some(old) = find_task(conn, id)? else {
        return Ok(false);
    };

    let rows = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
    if rows > 0 {
        log_audit(conn, "delete", Some(id), Some(&old), None)?;
    }
    Ok(rows > 0)
}

fn find_predecessor(conn: &Connection, id: TaskId) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE next_id = ?1"),
            params![id],
            parse_task,
        )
        .optional()?;
    Ok(task)
}

fn all_tasks(conn: &Connection) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id"))?;
    let tasks = stmt.query_map([], parse_task)?.flatten().collect();
    Ok(tasks)
}

fn delete_all_tasks(conn: &Connection) -> Result<usize> {
    let rows = conn.execute("DELETE FROM tasks", [])?;
    if rows > 0 {
        conn.execute(
            "INSERT INTO task_audit_log (operation) VALUES ('delete_all')",
            [],
        )?;
    }
    Ok(rows)
}

/// Run a list request, returning the page and the unpaged total count.
fn run_list(conn: &Connection, request: &ListRequest, today: NaiveDate) -> Result<TaskPage> {
    let (conditions, params_vec) = query::build_conditions(request, today)?;
    let where_clause = format!("WHERE {}", conditions.join(" AND "));
    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(AsRef::as_ref).collect();

    // Total first, ignoring paging, so callers can compute page counts.
    let total: u64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM tasks {where_clause}"),
        params_refs.as_slice(),
        |row| row.get(0),
    )?;

    let mut sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks {where_clause} {}",
        query::order_by_clause(request)
    );
    if request.page_size > -1 {
        sql.push_str(&format!(
            " LIMIT {} OFFSET {}",
            request.page_size,
            request.page_number * request.page_size
        ));
    }

    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt.query_map(params_refs.as_slice(), parse_task)?.flatten().collect();

    Ok(TaskPage { tasks, total })
}

/// Log an operation to the audit log with JSON row snapshots.
fn log_audit(
    conn: &Connection,
    operation: &str,
    task_id: Option<TaskId>,
    old: Option<&Task>,
    new: Option<&Task>,
) -> Result<()> {
    let old_json = old.map(serde_json::to_string).transpose()?;
    let new_json = new.map(serde_json::to_string).transpose()?;
    conn.execute(
        "INSERT INTO task_audit_log (operation, task_id, old_value, new_value)
         VALUES (?1, ?2, ?3, ?4)",
        params![operation, task_id, old_json, new_json],
    )?;
    Ok(())
}
