//! Sequence manager: task validation and recurring-chain maintenance.
//!
//! A task configured to repeat is materialized as `ends_after` discrete
//! rows linked through `next_id`. The head is occurrence 0; occurrence `i`
//! is due `i` repeat periods after the head, with calendar-aware month and
//! year arithmetic. Each successor row is persisted before its
//! predecessor's pointer is written, so no reader ever observes a forward
//! pointer to a row that does not exist, and the whole loop runs inside one
//! transaction so a failure leaves no partial chain behind.

use crate::error::{Error, Result};
use crate::tasks::models::{
    parse_input_date, Priority, Repeats, Task, TaskDraft, TaskId,
};
use crate::tasks::query::{ListRequest, TaskPage};
use crate::tasks::store::{SqliteTaskStore, TaskStore};
use chrono::{Days, Months, NaiveDate};

/// Owns creation and update of tasks and their recurring chains.
///
/// Mutations go through here; reads go through [`list`](Self::list) or
/// directly through the store.
#[derive(Debug, Clone)]
pub struct SequenceManager {
    store: SqliteTaskStore,
}

impl SequenceManager {
    /// Create a manager over the given store.
    #[must_use]
    pub const fn new(store: SqliteTaskStore) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &SqliteTaskStore {
        &self.store
    }

    /// Get the task with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no task has the id.
    pub fn get_by_id(&self, id: TaskId) -> Result<Task> {
        self.store.find_by_id(id)?.ok_or(Error::NotFound(id))
    }

    /// All tasks in the store, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn get_all(&self) -> Result<Vec<Task>> {
        self.store.all()
    }

    /// Answer a list request: a page of matching tasks plus the total count.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure or an invalid request.
    pub fn list(&self, request: &ListRequest) -> Result<TaskPage> {
        self.store.list(request)
    }

    /// Create a task, materializing its chain of occurrences if it repeats.
    ///
    /// The created task counts as occurrence 0, so a repeating task with
    /// `ends_after = n` produces `n - 1` additional linked rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for invalid properties, or a database
    /// error (in which case no row was written).
    pub fn create(&self, draft: &TaskDraft) -> Result<Task> {
        let validated = validate(draft, None, false)?;
        let head = self.store.transaction(|tx| {
            let head = tx.insert(&validated.to_task())?;
            if validated.repeats.is_repeating() {
                materialize(tx, 1, validated.ends_after, &head, head.clone(), &validated)?;
            }
            // Re-read: the first pointer write set the head's next_id.
            tx.find_by_id(head.id)?.ok_or(Error::NotFound(head.id))
        })?;
        tracing::debug!(id = head.id, repeats = %head.repeats, "created task");
        Ok(head)
    }

    /// Update the task with the given id.
    ///
    /// With `update_all`, the change is propagated down the chain: every
    /// already-materialized pending occurrence gets the same scalar
    /// properties with its due date recomputed for its position, and the
    /// chain is extended if `ends_after` grew. Without it only the
    /// addressed occurrence changes, deliberately detaching its content
    /// from the template its siblings still follow.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the id is unknown, [`Error::Validation`] for
    /// invalid properties, [`Error::Conflict`] if a concurrent request
    /// modified the task in between.
    pub fn update(&self, id: TaskId, draft: &TaskDraft, update_all: bool) -> Result<Task> {
        let existing = self.get_by_id(id)?;
        let validated = validate(draft, Some(&existing), update_all)?;

        let updated = self.store.transaction(|tx| {
            let current = tx.find_by_id(id)?.ok_or(Error::NotFound(id))?;
            if current.version != existing.version {
                return Err(Error::Conflict(id));
            }

            let mut task = current;
            apply_scalars(&mut task, &validated);
            if task.is_pending() {
                task.due_date = validated.due_date;
                task.repeats = validated.repeats;
                task.ends_after = validated.ends_after;
            }
            let task = tx.update(&task)?;

            if task.is_pending() && update_all {
                let mut current = task.clone();
                let mut index: i64 = 1;

                // Re-apply to every occurrence already in the chain. Completed
                // occurrences keep their frozen schedule but still pick up the
                // scalar edits.
                while let Some(next_id) = current.next_id {
                    let mut next = tx.find_by_id(next_id)?.ok_or(Error::NotFound(next_id))?;
                    apply_scalars(&mut next, &validated);
                    if next.is_pending() {
                        next.due_date = occurrence_due(&task, index)?;
                        next.repeats = validated.repeats;
                        next.ends_after = validated.ends_after - index;
                    }
                    current = tx.update(&next)?;
                    index += 1;
                }

                // Then grow the chain out to the new ends_after.
                if task.repeats.is_repeating() {
                    materialize(tx, index, validated.ends_after, &task, current, &validated)?;
                }

                return tx.find_by_id(id)?.ok_or(Error::NotFound(id));
            }

            Ok(task)
        })?;

        tracing::debug!(id, update_all, "updated task");
        Ok(updated)
    }

    /// Mark the task with the given id complete.
    ///
    /// Only `is_complete` and `date_completed` change; the next occurrence
    /// in the chain is unaffected and remains independently pending.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the id is unknown, [`Error::Validation`] if
    /// the completion date is missing or invalid.
    pub fn complete(&self, id: TaskId, draft: &TaskDraft) -> Result<Task> {
        let mut task = self.get_by_id(id)?;
        let date =
            draft.date_completed.as_deref().and_then(parse_input_date).ok_or_else(|| {
                Error::Validation(
                    "Tasks must have a valid date completed in format YYYY-MM-DD".to_string(),
                )
            })?;

        task.is_complete = true;
        task.date_completed = Some(date);
        let task = self.store.update(&task)?;
        tracing::debug!(id, "completed task");
        Ok(task)
    }

    /// Complete each of the given tasks with the same completion date.
    ///
    /// Stops at the first failing id and surfaces that failure; tasks
    /// completed before the failure stay completed.
    ///
    /// # Errors
    ///
    /// The first error from [`complete`](Self::complete).
    pub fn complete_all(&self, ids: &[TaskId], draft: &TaskDraft) -> Result<Vec<Task>> {
        let mut tasks = Vec::with_capacity(ids.len());
        for &id in ids {
            tasks.push(self.complete(id, draft)?);
        }
        Ok(tasks)
    }

    /// Delete exactly one occurrence, splicing it out of its chain.
    ///
    /// The predecessor's forward pointer is repointed at the deleted row's
    /// successor inside the same transaction, so the chain stays intact and
    /// no dangling pointer is ever observable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is unknown.
    pub fn delete(&self, id: TaskId) -> Result<Task> {
        let deleted = self.store.transaction(|tx| {
            let task = tx.find_by_id(id)?.ok_or(Error::NotFound(id))?;
            if let Some(mut predecessor) = tx.predecessor_of(id)? {
                predecessor.next_id = task.next_id;
                tx.update(&predecessor)?;
            }
            tx.delete(id)?;
            Ok(task)
        })?;
        tracing::debug!(id, "deleted task");
        Ok(deleted)
    }

    /// Delete every task. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn delete_all(&self) -> Result<usize> {
        let removed = self.store.delete_all()?;
        tracing::debug!(removed, "deleted all tasks");
        Ok(removed)
    }
}

/// Task properties after validation, with context-dependent defaults filled
/// in from the existing task when updating.
#[derive(Debug, Clone)]
struct Validated {
    name: String,
    priority: Priority,
    description: String,
    due_date: NaiveDate,
    repeats: Repeats,
    ends_after: i64,
}

impl Validated {
    /// A fresh pending task row with these properties.
    fn to_task(&self) -> Task {
        Task {
            id: 0,
            name: self.name.clone(),
            priority: self.priority,
            description: self.description.clone(),
            due_date: self.due_date,
            date_completed: None,
            is_complete: false,
            repeats: self.repeats,
            ends_after: self.ends_after,
            next_id: None,
            version: 0,
        }
    }
}

/// Validate draft properties, accumulating every violation into one error.
fn validate(draft: &TaskDraft, existing: Option<&Task>, update_all: bool) -> Result<Validated> {
    let mut violations: Vec<String> = Vec::new();

    let name = draft.name.clone().filter(|s| !s.trim().is_empty());
    if name.is_none() {
        violations.push("name".to_string());
    }
    if draft.priority.is_none() {
        violations.push("priority".to_string());
    }
    let description = draft.description.clone().filter(|s| !s.trim().is_empty());
    if description.is_none() {
        violations.push("description".to_string());
    }

    let due_date = match draft.due_date.as_deref().filter(|s| !s.is_empty()) {
        None => {
            violations.push("due date".to_string());
            None
        }
        Some(raw) => {
            let parsed = parse_input_date(raw);
            if parsed.is_none() {
                violations.push("valid due date in format YYYY-MM-DD".to_string());
            }
            parsed
        }
    };

    if let Some(task) = existing {
        if task.is_complete {
            // A completed task's schedule is frozen.
            if due_date.is_some_and(|d| d != task.due_date) {
                violations.push("due date to not change for complete Tasks".to_string());
            }
            if draft.repeats.is_some_and(|r| r != task.repeats) {
                violations.push("repeats to not change for complete Tasks".to_string());
            }
            if draft.ends_after.is_some_and(|n| n != task.ends_after) {
                violations.push("ends after to not change for complete Tasks".to_string());
            }
        } else if draft.ends_after.is_some_and(|n| n < task.ends_after) {
            // A pending chain's remaining count can only grow here; shrinking
            // it would claim to delete already-materialized occurrences.
            violations.push(format!(
                "ends after to be greater than or equal to '{}'",
                task.ends_after
            ));
        }
    }

    if !violations.is_empty() {
        return Err(Error::Validation(required_message(&violations)));
    }
    if update_all && draft.date_completed.is_some() {
        return Err(Error::Validation(
            "Tasks must be marked complete individually (you cannot mark multiple Tasks as \
             complete at the same time)"
                .to_string(),
        ));
    }

    let (Some(name), Some(priority), Some(description), Some(due_date)) =
        (name, draft.priority, description, due_date)
    else {
        // Unreachable: absence was recorded as a violation above.
        return Err(Error::Validation("Task requires name, priority, description, and due date"
            .to_string()));
    };

    Ok(Validated {
        name,
        priority,
        description,
        due_date,
        repeats: draft.repeats.or(existing.map(|t| t.repeats)).unwrap_or_default(),
        ends_after: draft.ends_after.or(existing.map(|t| t.ends_after)).unwrap_or(0),
    })
}

/// Build the aggregated "Task requires ..." message.
fn required_message(violations: &[String]) -> String {
    let mut message = String::from("Task requires");
    for (index, violation) in violations.iter().enumerate() {
        if index > 0 {
            message.push(',');
            if index + 1 == violations.len() {
                message.push_str(" and");
            }
        }
        message.push(' ');
        message.push_str(violation);
    }
    message
}

/// Apply the scalar properties shared by every occurrence of a sequence.
fn apply_scalars(task: &mut Task, validated: &Validated) {
    task.name = validated.name.clone();
    task.priority = validated.priority;
    task.description = validated.description.clone();
}

/// Due date of occurrence `index`, counted from the head of the chain.
fn occurrence_due(head: &Task, index: i64) -> Result<NaiveDate> {
    let out_of_range =
        || Error::Validation("due date out of supported calendar range".to_string());
    match head.repeats {
        Repeats::NoRepeat => Ok(head.due_date),
        Repeats::Daily => u64::try_from(index)
            .ok()
            .and_then(|days| head.due_date.checked_add_days(Days::new(days)))
            .ok_or_else(out_of_range),
        Repeats::Weekly => index
            .checked_mul(7)
            .and_then(|days| u64::try_from(days).ok())
            .and_then(|days| head.due_date.checked_add_days(Days::new(days)))
            .ok_or_else(out_of_range),
        Repeats::Monthly => u32::try_from(index)
            .ok()
            .and_then(|months| head.due_date.checked_add_months(Months::new(months)))
            .ok_or_else(out_of_range),
        Repeats::Yearly => u32::try_from(index)
            .ok()
            .and_then(|years| years.checked_mul(12))
            .and_then(|months| head.due_date.checked_add_months(Months::new(months)))
            .ok_or_else(out_of_range),
    }
}

/// Materialize occurrences `start..end` of a chain, linking each new row to
/// its predecessor only after the row itself is persisted.
fn materialize<S: TaskStore>(
    store: &S,
    start: i64,
    end: i64,
    head: &Task,
    mut current: Task,
    validated: &Validated,
) -> Result<Task> {
    for index in start..end {
        let mut occurrence = validated.to_task();
        occurrence.due_date = occurrence_due(head, index)?;
        occurrence.ends_after = validated.ends_after - index;
        let occurrence = store.insert(&occurrence)?;

        current.next_id = Some(occurrence.id);
        store.update(&current)?;
        current = occurrence;
    }
    Ok(current)
}
