//! Query engine: translates a list request into store predicates.
//!
//! A request carries a completion state, a free-form filter, a sort, and a
//! page. The filter is dispatched in a fixed precedence order: a parseable
//! calendar date first, then the keywords `overdue` / `today` / `tomorrow`,
//! and finally a case-insensitive substring match over name, priority, and
//! description. Keyword matching happens before text matching, so a pending
//! task whose description contains the literal word "overdue" is *not*
//! returned by the `overdue` filter unless its due date qualifies.

use crate::error::{Error, Result};
use crate::tasks::models::Task;
use chrono::NaiveDate;
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

/// Date formats accepted by the filter, tried in order.
///
/// `%m`/`%d` also accept single digits, so this covers `M/D/YYYY` variants.
const FILTER_DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

/// Ranks the textual priority column for semantic sorting.
const PRIORITY_RANK_EXPR: &str =
    "CASE priority WHEN 'Low' THEN 0 WHEN 'Medium' THEN 1 WHEN 'High' THEN 2 ELSE 3 END";

/// Column to sort results by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Sort by task id.
    Id,
    /// Sort by task name.
    Name,
    /// Sort by priority rank (Low first when ascending).
    Priority,
    /// Sort by due date (default).
    #[default]
    DueDate,
    /// Sort by completion date.
    DateCompleted,
    /// Sort by remaining occurrences.
    EndsAfter,
}

impl SortKey {
    /// Parse a sort key from a string, case-insensitively.
    ///
    /// Accepts both camelCase wire names and snake_case column names.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the unknown column.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "priority" => Ok(Self::Priority),
            "duedate" | "due_date" => Ok(Self::DueDate),
            "datecompleted" | "date_completed" => Ok(Self::DateCompleted),
            "endsafter" | "ends_after" => Ok(Self::EndsAfter),
            _ => Err(Error::Validation(format!("unknown sort column: '{s}'"))),
        }
    }

    /// The SQL expression this key sorts on.
    #[must_use]
    pub const fn sql_expr(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Priority => PRIORITY_RANK_EXPR,
            Self::DueDate => "due_date",
            Self::DateCompleted => "date_completed",
            Self::EndsAfter => "ends_after",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    /// Ascending (default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// Parse a sort order from a string, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns a validation error for anything other than ASC/DESC.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(Error::Validation(format!("unknown sort order: '{s}' (use ASC or DESC)"))),
        }
    }

    /// The SQL keyword for this direction.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A page of tasks plus the total number of rows matching the predicate
/// regardless of paging, so a caller can compute total pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPage {
    /// The requested page of tasks.
    pub tasks: Vec<Task>,
    /// Total matching rows, ignoring paging.
    pub total: u64,
}

/// Parameters for listing tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListRequest {
    /// False to search pending tasks, true for completed ones.
    pub is_complete: bool,
    /// Free-form filter: a date, a keyword, or substring text. `None` or the
    /// empty string matches everything.
    pub filter: Option<String>,
    /// Column to sort by.
    pub sort: SortKey,
    /// Sort direction.
    pub order: SortOrder,
    /// Zero-based page number. Ignored unless `page_size > -1`.
    pub page_number: i64,
    /// Rows per page. `-1` or less returns every matching row unpaginated.
    pub page_size: i64,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            is_complete: false,
            filter: None,
            sort: SortKey::default(),
            order: SortOrder::default(),
            page_number: 0,
            page_size: -1,
        }
    }
}

impl ListRequest {
    /// Request for all pending tasks, unpaginated.
    #[must_use]
    pub fn pending() -> Self {
        Self::default()
    }

    /// Request for all completed tasks, unpaginated.
    #[must_use]
    pub fn completed() -> Self {
        Self { is_complete: true, ..Self::default() }
    }

    /// Set the filter text.
    #[must_use]
    pub fn with_filter(mut self, filter: &str) -> Self {
        self.filter = Some(filter.to_string());
        self
    }

    /// Set the sort column and direction.
    #[must_use]
    pub const fn sorted_by(mut self, sort: SortKey, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }

    /// Set the page to return.
    #[must_use]
    pub const fn page(mut self, page_number: i64, page_size: i64) -> Self {
        self.page_number = page_number;
        self.page_size = page_size;
        self
    }
}

/// The result of dispatching a filter string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// No filter; match every task in the requested completion state.
    All,
    /// Match tasks due or completed on this exact date.
    Date(NaiveDate),
    /// Match pending tasks due strictly before today.
    Overdue,
    /// Match tasks due or completed today.
    Today,
    /// Match tasks due or completed tomorrow.
    Tomorrow,
    /// Substring match against name, priority, or description.
    Text(String),
}

impl Filter {
    /// Dispatch a raw filter string.
    ///
    /// The `overdue` keyword only applies when searching pending tasks; for
    /// completed tasks it falls through to a text match, as does any other
    /// unrecognized string.
    #[must_use]
    pub fn parse(raw: Option<&str>, searching_complete: bool) -> Self {
        let Some(raw) = raw.filter(|s| !s.is_empty()) else {
            return Self::All;
        };
        if let Some(date) = parse_filter_date(raw) {
            return Self::Date(date);
        }
        match raw.to_lowercase().as_str() {
            "overdue" if !searching_complete => Self::Overdue,
            "today" => Self::Today,
            "tomorrow" => Self::Tomorrow,
            _ => Self::Text(raw.to_string()),
        }
    }
}

/// Try to parse the filter as a calendar date in any accepted format.
#[must_use]
pub fn parse_filter_date(raw: &str) -> Option<NaiveDate> {
    FILTER_DATE_FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Build the WHERE conditions and bind parameters for a request.
///
/// `today` is the current UTC calendar day, injected so the keyword filters
/// are testable against a fixed date.
pub(crate) fn build_conditions(
    request: &ListRequest,
    today: NaiveDate,
) -> Result<(Vec<String>, Vec<Box<dyn ToSql>>)> {
    let mut conditions: Vec<String> = vec!["is_complete = ?".to_string()];
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(request.is_complete)];

    match Filter::parse(request.filter.as_deref(), request.is_complete) {
        Filter::All => {}
        Filter::Date(date) => push_day_match(&mut conditions, &mut params, date),
        Filter::Overdue => {
            conditions.push("due_date < ?".to_string());
            params.push(Box::new(today));
        }
        Filter::Today => push_day_match(&mut conditions, &mut params, today),
        Filter::Tomorrow => {
            let tomorrow = today
                .succ_opt()
                .ok_or_else(|| Error::Validation("date out of supported range".to_string()))?;
            push_day_match(&mut conditions, &mut params, tomorrow);
        }
        Filter::Text(text) => {
            conditions
                .push("(name LIKE ? OR priority LIKE ? OR description LIKE ?)".to_string());
            let pattern = format!("%{text}%");
            params.push(Box::new(pattern.clone()));
            params.push(Box::new(pattern.clone()));
            params.push(Box::new(pattern));
        }
    }

    Ok((conditions, params))
}

/// A task matches a day if it is due that day or was completed that day.
fn push_day_match(
    conditions: &mut Vec<String>,
    params: &mut Vec<Box<dyn ToSql>>,
    day: NaiveDate,
) {
    conditions.push("(due_date = ? OR date_completed = ?)".to_string());
    params.push(Box::new(day));
    params.push(Box::new(day));
}

/// ORDER BY clause for a request, with a stable id tiebreak.
pub(crate) fn order_by_clause(request: &ListRequest) -> String {
    format!("ORDER BY {} {}, id ASC", request.sort.sql_expr(), request.order.as_sql())
}
