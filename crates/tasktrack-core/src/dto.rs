use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::TaskId;
use crate::status::TaskStatus;

/// Externally-facing task representation.
///
/// Every field is optional on the way in so that missing or malformed values
/// are reported by [`crate::validation::validate_task`] as field errors
/// instead of failing JSON decoding. `task_id` and `project_name` are
/// assigned by the store and ignored on input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub task_id: Option<TaskId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Validated, storage-ready task fields. Carries neither identity nor
/// project linkage; the caller supplies both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: i32,
    pub due_date: Option<NaiveDate>,
}

/// Body of `PUT /api/v1/tasks/batch-status-updates`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusUpdate {
    #[serde(default)]
    pub task_ids: Vec<TaskId>,
    #[serde(default)]
    pub new_status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_camel_case_body() {
        let dto: TaskDto = serde_json::from_value(json!({
            "title": "Write report",
            "description": "Quarterly numbers",
            "status": "In Progress",
            "priority": 2,
            "dueDate": "2030-01-15"
        }))
        .unwrap();

        assert_eq!(dto.title.as_deref(), Some("Write report"));
        assert_eq!(dto.status.as_deref(), Some("In Progress"));
        assert_eq!(dto.priority, Some(2));
        assert_eq!(dto.due_date, NaiveDate::from_ymd_opt(2030, 1, 15));
        assert!(dto.task_id.is_none());
    }

    #[test]
    fn missing_fields_default_to_none() {
        let dto: TaskDto = serde_json::from_value(json!({})).unwrap();
        assert_eq!(dto, TaskDto::default());
    }

    #[test]
    fn serializes_store_assigned_fields() {
        let dto = TaskDto {
            project_name: Some("Apollo".into()),
            task_id: Some(TaskId::new(5)),
            title: Some("t".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&dto).unwrap();
        assert_eq!(value["projectName"], "Apollo");
        assert_eq!(value["taskId"], 5);
        assert!(value["dueDate"].is_null());
    }

    #[test]
    fn batch_body_shape() {
        let body: BatchStatusUpdate =
            serde_json::from_value(json!({ "taskIds": [1, 2], "newStatus": "Completed" })).unwrap();
        assert_eq!(body.task_ids, vec![TaskId::new(1), TaskId::new(2)]);
        assert_eq!(body.new_status.as_deref(), Some("Completed"));
    }
}
