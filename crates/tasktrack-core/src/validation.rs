use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dto::{TaskDto, TaskInput};
use crate::status::TaskStatus;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 255;
pub const MIN_PRIORITY: i32 = 1;

const STATUS_PATTERN_MESSAGE: &str = "Status must be 'In Progress', 'Pending', or 'Completed'";

/// A single rejected input field, reported to clients as `{field, message}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a transfer-shape task against the field rules and produce the
/// storage-ready input. All violations are collected, not just the first.
///
/// `today` is the reference date for the present-or-future due date rule.
pub fn validate_task(dto: &TaskDto, today: NaiveDate) -> Result<TaskInput, Vec<FieldError>> {
    let mut errors = Vec::new();

    let title = match &dto.title {
        None => {
            errors.push(FieldError::new("title", "Title is required"));
            None
        }
        Some(t) if t.chars().count() > TITLE_MAX_CHARS => {
            errors.push(FieldError::new("title", "Title cannot exceed 100 characters"));
            None
        }
        Some(t) => Some(t.clone()),
    };

    if let Some(d) = &dto.description {
        if d.chars().count() > DESCRIPTION_MAX_CHARS {
            errors.push(FieldError::new(
                "description",
                "Description cannot exceed 255 characters",
            ));
        }
    }

    let status = match parse_status("status", dto.status.as_deref()) {
        Ok(s) => Some(s),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    let priority = match dto.priority {
        None => {
            errors.push(FieldError::new("priority", "Priority is required"));
            None
        }
        Some(p) if p < MIN_PRIORITY => {
            errors.push(FieldError::new("priority", "Priority must be at least 1"));
            None
        }
        Some(p) => Some(p),
    };

    if let Some(due) = dto.due_date {
        if due < today {
            errors.push(FieldError::new(
                "dueDate",
                "Due date must be in the present or future",
            ));
        }
    }

    match (title, status, priority) {
        (Some(title), Some(status), Some(priority)) if errors.is_empty() => Ok(TaskInput {
            title,
            description: dto.description.clone(),
            status,
            priority,
            due_date: dto.due_date,
        }),
        _ => Err(errors),
    }
}

/// Parse a required status value, reporting failures against `field`.
pub fn parse_status(field: &str, raw: Option<&str>) -> Result<TaskStatus, FieldError> {
    let raw = raw.ok_or_else(|| FieldError::new(field, "Status is required"))?;
    raw.parse()
        .map_err(|_| FieldError::new(field, STATUS_PATTERN_MESSAGE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn valid_dto() -> TaskDto {
        TaskDto {
            title: Some("Ship release".into()),
            description: Some("Tag and publish".into()),
            status: Some("Pending".into()),
            priority: Some(1),
            due_date: Some(today()),
            ..Default::default()
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn accepts_valid_input() {
        let input = validate_task(&valid_dto(), today()).unwrap();
        assert_eq!(input.title, "Ship release");
        assert_eq!(input.status, TaskStatus::Pending);
        assert_eq!(input.priority, 1);
        assert_eq!(input.due_date, Some(today()));
    }

    #[test]
    fn due_date_is_optional() {
        let dto = TaskDto {
            due_date: None,
            ..valid_dto()
        };
        assert!(validate_task(&dto, today()).is_ok());
    }

    #[test]
    fn reports_every_missing_required_field() {
        let errors = validate_task(&TaskDto::default(), today()).unwrap_err();
        assert_eq!(fields(&errors), vec!["title", "status", "priority"]);
        assert_eq!(errors[0].message, "Title is required");
        assert_eq!(errors[1].message, "Status is required");
        assert_eq!(errors[2].message, "Priority is required");
    }

    #[test]
    fn length_limits_count_characters() {
        let dto = TaskDto {
            title: Some("é".repeat(100)),
            description: Some("x".repeat(255)),
            ..valid_dto()
        };
        assert!(validate_task(&dto, today()).is_ok());

        let dto = TaskDto {
            title: Some("t".repeat(101)),
            description: Some("x".repeat(256)),
            ..valid_dto()
        };
        let errors = validate_task(&dto, today()).unwrap_err();
        assert_eq!(fields(&errors), vec!["title", "description"]);
    }

    #[test]
    fn rejects_unknown_status_spelling() {
        let dto = TaskDto {
            status: Some("Done".into()),
            ..valid_dto()
        };
        let errors = validate_task(&dto, today()).unwrap_err();
        assert_eq!(errors, vec![FieldError::new("status", STATUS_PATTERN_MESSAGE)]);
    }

    #[test]
    fn rejects_priority_below_one() {
        let dto = TaskDto {
            priority: Some(0),
            ..valid_dto()
        };
        let errors = validate_task(&dto, today()).unwrap_err();
        assert_eq!(errors[0].message, "Priority must be at least 1");
    }

    #[test]
    fn rejects_past_due_date() {
        let dto = TaskDto {
            due_date: today().pred_opt(),
            ..valid_dto()
        };
        let errors = validate_task(&dto, today()).unwrap_err();
        assert_eq!(fields(&errors), vec!["dueDate"]);
    }

    #[test]
    fn ignores_store_assigned_fields() {
        let dto = TaskDto {
            project_name: Some("ignored".into()),
            task_id: Some(crate::TaskId::new(99)),
            ..valid_dto()
        };
        let input = validate_task(&dto, today()).unwrap();
        assert_eq!(input.title, "Ship release");
    }

    #[test]
    fn parse_status_reports_field_name() {
        let err = parse_status("newStatus", None).unwrap_err();
        assert_eq!(err.field, "newStatus");
        assert_eq!(
            parse_status("newStatus", Some("In Progress")).unwrap(),
            TaskStatus::InProgress
        );
    }
}
