use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use taskboard_core::{DomainError, DomainResult, FieldErrors, TaskId, UserId};

pub const MAX_TITLE_LEN: usize = 255;

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

/// Task status.
///
/// The usual lifecycle is pending → in_progress → completed, but any actor
/// allowed to update a task may set any status in any order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl core::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("the selected status is invalid (expected one of: pending, in_progress, completed)")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Task
// ─────────────────────────────────────────────────────────────────────────────

/// A persisted task.
///
/// # Invariants
/// - `title` is non-empty and at most 255 characters.
/// - `owner_id` references an existing user (the store cascades deletes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Materialize a draft once the store has assigned an id.
    pub fn from_draft(id: TaskId, draft: TaskDraft) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            status: draft.status,
            due_date: draft.due_date,
            owner_id: draft.owner_id,
            created_at: draft.created_at,
            updated_at: draft.created_at,
        }
    }

    /// Apply a validated patch. Authorization for the patch (including any
    /// owner change) must already have been decided.
    pub fn apply(&mut self, patch: TaskPatch, at: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(owner_id) = patch.owner_id {
            self.owner_id = owner_id;
        }
        self.updated_at = at;
    }
}

/// Listing filter. `owner: None` lists every owner's tasks.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub owner: Option<UserId>,
    pub status: Option<TaskStatus>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.owner.is_none_or(|owner| task.owner_id == owner)
            && self.status.is_none_or(|status| task.status == status)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Create
// ─────────────────────────────────────────────────────────────────────────────

/// Raw create input. Status and due date stay strings so that bad values
/// become field errors instead of body rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<String>,
}

/// A validated task ready to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl NewTaskInput {
    /// Validate into a draft owned by `owner_id`.
    ///
    /// A due date, when given, must fall strictly after `today`.
    pub fn validate(self, owner_id: UserId, today: NaiveDate, at: DateTime<Utc>) -> DomainResult<TaskDraft> {
        let mut errors = FieldErrors::new();

        let title = match self.title {
            None => {
                errors.add("title", "the title field is required");
                None
            }
            Some(t) => check_title(&mut errors, t),
        };

        let status = match self.status {
            None => Some(TaskStatus::default()),
            Some(raw) => parse_status(&mut errors, &raw),
        };

        let due_date = match self.due_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match parse_due_date(&mut errors, raw) {
                Some(date) if date <= today => {
                    errors.add("due_date", "the due date must be a date after today");
                    None
                }
                other => other,
            },
        };

        match (title, status) {
            (Some(title), Some(status)) if errors.is_empty() => Ok(TaskDraft {
                title,
                description: normalize_description(self.description),
                status,
                due_date,
                owner_id,
                created_at: at,
            }),
            _ => Err(DomainError::Validation(errors)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Update
// ─────────────────────────────────────────────────────────────────────────────

/// Raw update input. For `description` and `due_date` the outer `Option`
/// says whether the field was sent, the inner whether it is set or cleared.
#[derive(Debug, Clone, Default)]
pub struct TaskPatchInput {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub due_date: Option<Option<String>>,
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<Option<NaiveDate>>,
    pub owner_id: Option<UserId>,
}

impl TaskPatchInput {
    pub fn validate(self) -> DomainResult<TaskPatch> {
        let mut errors = FieldErrors::new();

        let title = self.title.and_then(|t| check_title(&mut errors, t));
        let status = self.status.and_then(|raw| parse_status(&mut errors, &raw));
        let due_date = match self.due_date {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) if raw.trim().is_empty() => Some(None),
            Some(Some(raw)) => parse_due_date(&mut errors, raw.trim()).map(Some),
        };

        errors.into_result()?;
        Ok(TaskPatch {
            title,
            description: self.description.map(normalize_description),
            status,
            due_date,
            owner_id: self.owner_id,
        })
    }
}

impl TaskPatchInput {
    /// The new owner, if this update moves the task to a different user.
    ///
    /// Works on unvalidated input.
    pub fn reassignment(&self, task: &Task) -> Option<UserId> {
        self.owner_id.filter(|owner| *owner != task.owner_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Field rules
// ─────────────────────────────────────────────────────────────────────────────

fn check_title(errors: &mut FieldErrors, title: String) -> Option<String> {
    let title = title.trim().to_string();
    if title.is_empty() {
        errors.add("title", "the title field is required");
        return None;
    }
    if title.chars().count() > MAX_TITLE_LEN {
        errors.add(
            "title",
            format!("the title may not be greater than {MAX_TITLE_LEN} characters"),
        );
        return None;
    }
    Some(title)
}

fn parse_status(errors: &mut FieldErrors, raw: &str) -> Option<TaskStatus> {
    match raw.parse::<TaskStatus>() {
        Ok(status) => Some(status),
        Err(e) => {
            errors.add("status", e.to_string());
            None
        }
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (its UTC date is used).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

fn parse_due_date(errors: &mut FieldErrors, raw: &str) -> Option<NaiveDate> {
    let date = parse_date(raw);
    if date.is_none() {
        errors.add("due_date", "the due date is not a valid date");
    }
    date
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const OWNER: UserId = UserId::new(3);

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    fn input(title: &str) -> NewTaskInput {
        NewTaskInput {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn field_names(err: DomainError) -> Vec<&'static str> {
        match err {
            DomainError::Validation(f) => f.fields().collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn task() -> Task {
        let draft = input("Write report").validate(OWNER, today(), Utc::now()).unwrap();
        Task::from_draft(TaskId::new(1), draft)
    }

    #[test]
    fn create_defaults_to_pending() {
        let draft = input("  Write report ").validate(OWNER, today(), Utc::now()).unwrap();
        assert_eq!(draft.title, "Write report");
        assert_eq!(draft.status, TaskStatus::Pending);
        assert_eq!(draft.owner_id, OWNER);
        assert_eq!(draft.due_date, None);
    }

    #[test]
    fn create_reports_every_bad_field() {
        let err = NewTaskInput {
            title: Some(String::new()),
            description: None,
            status: Some("invalid_status".into()),
            due_date: Some("invalid_date".into()),
        }
        .validate(OWNER, today(), Utc::now())
        .unwrap_err();

        assert_eq!(field_names(err), vec!["due_date", "status", "title"]);
    }

    #[test]
    fn create_requires_future_due_date() {
        let mut i = input("Plan");
        i.due_date = Some("2026-06-15".into());
        assert_eq!(
            field_names(i.validate(OWNER, today(), Utc::now()).unwrap_err()),
            vec!["due_date"]
        );

        let mut i = input("Plan");
        i.due_date = Some("2026-06-16T08:00:00Z".into());
        let draft = i.validate(OWNER, today(), Utc::now()).unwrap();
        assert_eq!(draft.due_date, NaiveDate::from_ymd_opt(2026, 6, 16));
    }

    #[test]
    fn title_length_is_bounded() {
        let exact = "a".repeat(MAX_TITLE_LEN);
        assert!(input(&exact).validate(OWNER, today(), Utc::now()).is_ok());

        let long = "a".repeat(MAX_TITLE_LEN + 1);
        assert_eq!(
            field_names(input(&long).validate(OWNER, today(), Utc::now()).unwrap_err()),
            vec!["title"]
        );
    }

    #[test]
    fn update_accepts_past_due_dates_and_clearing() {
        let patch = TaskPatchInput {
            due_date: Some(Some("2020-01-01".into())),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(patch.due_date, Some(NaiveDate::from_ymd_opt(2020, 1, 1)));

        let patch = TaskPatchInput {
            due_date: Some(None),
            description: Some(None),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(patch.due_date, Some(None));
        assert_eq!(patch.description, Some(None));
    }

    #[test]
    fn update_rejects_empty_title_and_bad_values() {
        let err = TaskPatchInput {
            title: Some(String::new()),
            status: Some("invalid_status".into()),
            due_date: Some(Some("invalid_date".into())),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(field_names(err), vec!["due_date", "status", "title"]);
    }

    #[test]
    fn status_may_jump_straight_to_completed() {
        let mut t = task();
        let patch = TaskPatchInput {
            status: Some("completed".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        t.apply(patch, Utc::now());
        assert_eq!(t.status, TaskStatus::Completed);
    }

    #[test]
    fn reassignment_only_counts_real_owner_changes() {
        let t = task();
        let same = TaskPatchInput {
            owner_id: Some(OWNER),
            ..Default::default()
        };
        assert_eq!(same.reassignment(&t), None);

        let other = TaskPatchInput {
            owner_id: Some(UserId::new(99)),
            ..Default::default()
        };
        assert_eq!(other.reassignment(&t), Some(UserId::new(99)));
    }

    #[test]
    fn filter_matches_owner_and_status() {
        let t = task();
        assert!(TaskFilter::default().matches(&t));
        assert!(TaskFilter { owner: Some(OWNER), status: Some(TaskStatus::Pending) }.matches(&t));
        assert!(!TaskFilter { owner: Some(UserId::new(4)), status: None }.matches(&t));
        assert!(!TaskFilter { owner: None, status: Some(TaskStatus::Completed) }.matches(&t));
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    proptest! {
        #[test]
        fn any_non_blank_short_title_is_accepted(title in "[A-Za-z0-9][A-Za-z0-9 ]{0,200}") {
            let draft = input(&title).validate(OWNER, today(), Utc::now()).unwrap();
            prop_assert_eq!(draft.title, title.trim().to_string());
        }
    }
}
