use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, info, instrument, warn};

use tasktrack_core::validation::{parse_status, validate_task};
use tasktrack_core::{BatchStatusUpdate, FieldError, ProjectId, TaskDto, TaskId, TaskStatus};
use tasktrack_store::{PageRequest, SortField, TaskRecord, TaskRepository};

use crate::error::ServiceError;
use crate::mapper;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound for `page` and `size`, matching a signed 32-bit query value.
const MAX_PAGING_VALUE: i64 = i32::MAX as i64;

/// Raw paging parameters as received from a query string.
#[derive(Clone, Debug, Default)]
pub struct ListParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
}

type Today = dyn Fn() -> NaiveDate + Send + Sync;

/// Task operations: validation and the mutation gate on top of a
/// [`TaskRepository`].
pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
    today: Arc<Today>,
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self {
            repo,
            today: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Use a fixed notion of "today" for due-date rules.
    pub fn with_today(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    fn today(&self) -> NaiveDate {
        (self.today)()
    }

    #[instrument(skip(self, dto))]
    pub fn create(&self, project_id: ProjectId, dto: &TaskDto) -> Result<TaskDto, ServiceError> {
        let input = validate_task(dto, self.today()).map_err(ServiceError::InvalidFields)?;
        let record = self.repo.insert(project_id, &input)?;
        info!(task_id = %record.id, "task created");
        Ok(mapper::to_dto(&record))
    }

    #[instrument(skip(self, dto), fields(task_id = %id))]
    pub fn update(&self, id: TaskId, dto: &TaskDto) -> Result<TaskDto, ServiceError> {
        let input = validate_task(dto, self.today()).map_err(ServiceError::InvalidFields)?;
        let existing = self.load(id)?;
        if !existing.status.is_mutable() {
            warn!(status = %existing.status, "update refused");
            return Err(ServiceError::Validation(format!(
                "Cannot update task with status: {}",
                existing.status
            )));
        }
        let record = self.repo.replace(id, &input)?;
        info!("task updated");
        Ok(mapper::to_dto(&record))
    }

    #[instrument(skip(self), fields(task_id = %id))]
    pub fn delete(&self, id: TaskId) -> Result<(), ServiceError> {
        let existing = self.load(id)?;
        if !existing.status.is_mutable() {
            warn!(status = %existing.status, "delete refused");
            return Err(ServiceError::Validation(format!(
                "Cannot delete task with status: {}",
                existing.status
            )));
        }
        if !self.repo.delete(id)? {
            return Err(not_found(id));
        }
        info!("task deleted");
        Ok(())
    }

    pub fn get_by_id(&self, id: TaskId) -> Result<TaskDto, ServiceError> {
        self.load(id).map(|record| mapper::to_dto(&record))
    }

    pub fn list_all(&self, params: &ListParams) -> Result<Vec<TaskDto>, ServiceError> {
        let page = page_request(params)?;
        debug!(?page, "listing tasks");
        Ok(mapper::to_dtos(&self.repo.find_page(&page)?))
    }

    pub fn list_overdue(&self) -> Result<Vec<TaskDto>, ServiceError> {
        Ok(mapper::to_dtos(&self.repo.find_overdue(self.today())?))
    }

    pub fn list_by_project(&self, project_id: ProjectId) -> Result<Vec<TaskDto>, ServiceError> {
        Ok(mapper::to_dtos(&self.repo.find_by_project(project_id)?))
    }

    pub fn list_by_project_and_status(
        &self,
        project_id: ProjectId,
        status: &str,
    ) -> Result<Vec<TaskDto>, ServiceError> {
        let status = parse_status("status", Some(status))?;
        Ok(mapper::to_dtos(
            &self.repo.find_by_project_and_status(project_id, status)?,
        ))
    }

    pub fn list_completed_after(
        &self,
        project_id: ProjectId,
        due_date: NaiveDate,
    ) -> Result<Vec<TaskDto>, ServiceError> {
        Ok(mapper::to_dtos(&self.repo.find_by_project_status_due_after(
            project_id,
            TaskStatus::Completed,
            due_date,
        )?))
    }

    /// Overwrite the status of every listed task in one transaction.
    ///
    /// Unknown ids are skipped. The mutation gate is not applied here, so a
    /// completed task can be moved back to pending through this call.
    #[instrument(skip(self, request), fields(requested = request.task_ids.len()))]
    pub fn batch_update_status(&self, request: &BatchStatusUpdate) -> Result<usize, ServiceError> {
        let status = parse_status("newStatus", request.new_status.as_deref())?;
        let updated = self.repo.update_status_batch(&request.task_ids, status)?;
        if updated < request.task_ids.len() {
            debug!(updated, "some batch ids were skipped");
        }
        info!(updated, %status, "batch status update applied");
        Ok(updated)
    }

    fn load(&self, id: TaskId) -> Result<TaskRecord, ServiceError> {
        self.repo.find_by_id(id)?.ok_or_else(|| not_found(id))
    }
}

fn not_found(id: TaskId) -> ServiceError {
    ServiceError::NotFound(format!("Task not found with id: {id}"))
}

fn page_request(params: &ListParams) -> Result<PageRequest, ServiceError> {
    let mut errors = Vec::new();

    let page = match params.page.unwrap_or(0) {
        p if p < 0 => {
            errors.push(FieldError::new("page", "Page index must not be less than zero"));
            0
        }
        p if p > MAX_PAGING_VALUE => {
            errors.push(FieldError::new(
                "page",
                format!("Page index must not be greater than {MAX_PAGING_VALUE}"),
            ));
            0
        }
        p => p as u32,
    };

    let size = match params.size.unwrap_or(i64::from(DEFAULT_PAGE_SIZE)) {
        s if s < 1 => {
            errors.push(FieldError::new("size", "Page size must not be less than one"));
            DEFAULT_PAGE_SIZE
        }
        s if s > MAX_PAGING_VALUE => {
            errors.push(FieldError::new(
                "size",
                format!("Page size must not be greater than {MAX_PAGING_VALUE}"),
            ));
            DEFAULT_PAGE_SIZE
        }
        s => s as u32,
    };

    let sort = match params.sort_by.as_deref() {
        None => SortField::default(),
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            errors.push(FieldError::new("sortBy", format!("No property '{raw}' found for type 'Task'")));
            SortField::default()
        }),
    };

    let request = PageRequest { page, size, sort };
    if errors.is_empty() && request.offset().is_none() {
        errors.push(FieldError::new("page", "Page offset is out of range"));
    }

    if errors.is_empty() {
        Ok(request)
    } else {
        Err(ServiceError::InvalidFields(errors))
    }
}
