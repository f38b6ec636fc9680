//! Task model types for the task tracker.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned task identifier.
pub type TaskId = i64;

/// Task priority levels.
///
/// Persisted as the display string so free-text filtering can match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority (default).
    #[default]
    Medium,
    /// High priority.
    High,
    /// Urgent - needs attention now.
    Urgent,
}

impl Priority {
    /// Parse a priority from a string, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid priority.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, InvalidPriority> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(InvalidPriority(s.to_string())),
        }
    }

    /// Get the string representation of the priority.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }

    /// Rank for semantic sorting (0 = least important).
    #[must_use]
    pub const fn rank(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid priority string is provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPriority(pub String);

impl std::fmt::Display for InvalidPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid priority: '{}' (must be one of: Low, Medium, High, Urgent)", self.0)
    }
}

impl std::error::Error for InvalidPriority {}

/// How often a task repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Repeats {
    /// One-off task (default).
    #[default]
    NoRepeat,
    /// Repeats every day.
    Daily,
    /// Repeats every week.
    Weekly,
    /// Repeats every calendar month.
    Monthly,
    /// Repeats every calendar year.
    Yearly,
}

impl Repeats {
    /// Parse a repeat frequency from a string, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid frequency.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, InvalidRepeats> {
        match s.to_lowercase().as_str() {
            "norepeat" => Ok(Self::NoRepeat),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(InvalidRepeats(s.to_string())),
        }
    }

    /// Get the string representation of the frequency.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoRepeat => "noRepeat",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Whether tasks with this frequency form a sequence of occurrences.
    #[must_use]
    pub const fn is_repeating(&self) -> bool {
        !matches!(self, Self::NoRepeat)
    }
}

impl std::fmt::Display for Repeats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid repeat frequency string is provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRepeats(pub String);

impl std::fmt::Display for InvalidRepeats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid repeat frequency: '{}' (must be one of: noRepeat, daily, weekly, monthly, yearly)",
            self.0
        )
    }
}

impl std::error::Error for InvalidRepeats {}

/// A task to be completed.
///
/// A repeating task is materialized as a chain of occurrences linked through
/// `next_id`: every occurrence except the last points at the next one, and
/// `ends_after` counts the occurrences remaining from that link onward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned primary key.
    pub id: TaskId,
    /// The name of the task.
    pub name: String,
    /// Priority of the task.
    pub priority: Priority,
    /// Detailed description of the task.
    pub description: String,
    /// Calendar date the task is due (no time component).
    pub due_date: NaiveDate,
    /// Calendar date the task was completed. `Some` iff `is_complete`.
    pub date_completed: Option<NaiveDate>,
    /// True once the task has been marked complete. Never reverts.
    pub is_complete: bool,
    /// How often the task repeats.
    pub repeats: Repeats,
    /// Occurrences remaining in the repeat sequence, counting this one.
    pub ends_after: i64,
    /// The next occurrence in the sequence, absent on the last one.
    pub next_id: Option<TaskId>,
    /// Optimistic-concurrency counter, incremented on every write.
    pub version: i64,
}

impl Task {
    /// Whether the task is still pending.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        !self.is_complete
    }
}

/// Caller-supplied task properties, before validation.
///
/// Every field is optional; the sequence manager validates presence and
/// formats and reports all violations at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDraft {
    /// The name of the task.
    pub name: Option<String>,
    /// Priority of the task.
    pub priority: Option<Priority>,
    /// Detailed description of the task.
    pub description: Option<String>,
    /// Due date as `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub due_date: Option<String>,
    /// Completion date, only meaningful for [`complete`](crate::tasks::sequence::SequenceManager::complete).
    pub date_completed: Option<String>,
    /// How often the task repeats.
    pub repeats: Option<Repeats>,
    /// Total occurrences in the repeat sequence.
    pub ends_after: Option<i64>,
}

impl TaskDraft {
    /// Build a draft with the four required fields set.
    #[must_use]
    pub fn new(name: &str, priority: Priority, description: &str, due_date: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            priority: Some(priority),
            description: Some(description.to_string()),
            due_date: Some(due_date.to_string()),
            ..Self::default()
        }
    }

    /// Set the repeat frequency and sequence length.
    #[must_use]
    pub fn repeating(mut self, repeats: Repeats, ends_after: i64) -> Self {
        self.repeats = Some(repeats);
        self.ends_after = Some(ends_after);
        self
    }
}

/// Parse a caller-supplied date as `YYYY-MM-DD`, or as an RFC 3339 timestamp
/// normalized to its UTC calendar date.
///
/// Time-of-day components are always discarded; the engine only ever stores
/// calendar dates.
#[must_use]
pub fn parse_input_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_str() {
        assert_eq!(Priority::from_str("Low").unwrap(), Priority::Low);
        assert_eq!(Priority::from_str("URGENT").unwrap(), Priority::Urgent);
        assert_eq!(Priority::from_str("medium").unwrap(), Priority::Medium);
        assert!(Priority::from_str("whenever").is_err());
    }

    #[test]
    fn test_priority_rank_ordering() {
        assert!(Priority::Low.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::High.rank());
        assert!(Priority::High.rank() < Priority::Urgent.rank());
    }

    #[test]
    fn test_priority_serde_uses_display_names() {
        assert_eq!(serde_json::to_string(&Priority::Urgent).unwrap(), "\"Urgent\"");
        let parsed: Priority = serde_json::from_str("\"Low\"").unwrap();
        assert_eq!(parsed, Priority::Low);
    }

    #[test]
    fn test_repeats_from_str() {
        assert_eq!(Repeats::from_str("noRepeat").unwrap(), Repeats::NoRepeat);
        assert_eq!(Repeats::from_str("NOREPEAT").unwrap(), Repeats::NoRepeat);
        assert_eq!(Repeats::from_str("weekly").unwrap(), Repeats::Weekly);
        assert!(Repeats::from_str("fortnightly").is_err());
    }

    #[test]
    fn test_repeats_serde_camel_case() {
        assert_eq!(serde_json::to_string(&Repeats::NoRepeat).unwrap(), "\"noRepeat\"");
        let parsed: Repeats = serde_json::from_str("\"monthly\"").unwrap();
        assert_eq!(parsed, Repeats::Monthly);
    }

    #[test]
    fn test_is_repeating() {
        assert!(!Repeats::NoRepeat.is_repeating());
        assert!(Repeats::Daily.is_repeating());
        assert!(Repeats::Yearly.is_repeating());
    }

    #[test]
    fn test_parse_input_date_iso() {
        assert_eq!(
            parse_input_date("2024-01-10"),
            Some(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
        );
    }

    #[test]
    fn test_parse_input_date_rfc3339_truncates_to_utc_day() {
        // 23:30 in UTC-2 is 01:30 the next day in UTC.
        assert_eq!(
            parse_input_date("2024-01-10T23:30:00-02:00"),
            Some(NaiveDate::from_ymd_opt(2024, 1, 11).unwrap())
        );
    }

    #[test]
    fn test_parse_input_date_rejects_garbage() {
        assert_eq!(parse_input_date("not a date"), None);
        assert_eq!(parse_input_date("01/10/2024"), None);
        assert_eq!(parse_input_date("2024-13-40"), None);
    }

    #[test]
    fn test_task_serialization_round_trip() {
        let task = Task {
            id: 1,
            name: "Water the plants".to_string(),
            priority: Priority::Low,
            description: "Just the ones on the balcony".to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            date_completed: None,
            is_complete: false,
            repeats: Repeats::Weekly,
            ends_after: 4,
            next_id: Some(2),
            version: 0,
        };

        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"dueDate\":\"2024-01-10\""));
        assert!(json.contains("\"nextId\":2"));
        let parsed: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, task);
    }

    #[test]
    fn test_draft_deserializes_from_camel_case() {
        let draft: TaskDraft = serde_json::from_str(
            r#"{"name":"Pay rent","priority":"High","description":"First of the month",
                "dueDate":"2024-02-01","repeats":"monthly","endsAfter":12}"#,
        )
        .unwrap();
        assert_eq!(draft.name.as_deref(), Some("Pay rent"));
        assert_eq!(draft.priority, Some(Priority::High));
        assert_eq!(draft.repeats, Some(Repeats::Monthly));
        assert_eq!(draft.ends_after, Some(12));
        assert!(draft.date_completed.is_none());
    }
}
