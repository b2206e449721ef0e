//! Conversion from stored task records to the transfer shape.
//!
//! The reverse direction is [`tasktrack_core::validation::validate_task`],
//! which yields a [`tasktrack_core::TaskInput`] without id or project.

use tasktrack_core::TaskDto;
use tasktrack_store::TaskRecord;

pub fn to_dto(record: &TaskRecord) -> TaskDto {
    TaskDto {
        project_name: Some(record.project_name.clone()),
        task_id: Some(record.id),
        title: Some(record.title.clone()),
        description: record.description.clone(),
        status: Some(record.status.to_string()),
        priority: Some(record.priority),
        due_date: record.due_date,
    }
}

pub fn to_dtos(records: &[TaskRecord]) -> Vec<TaskDto> {
    records.iter().map(to_dto).collect()
}
