//! REST handlers for `/api/v1/tasks`.
//!
//! Handlers only decode the request and pick a status code; every rule lives
//! in [`TaskService`](tasktrack_engine::TaskService). Extractor rejections are
//! caught here so malformed input gets the same field-error body as a
//! validation failure.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use tasktrack_core::{BatchStatusUpdate, ProjectId, TaskDto, TaskId};
use tasktrack_engine::ListParams;

use crate::error::ApiError;
use crate::server::AppState;

pub const TASK_DELETED: &str = "Task deleted successfully";
pub const BATCH_UPDATED: &str = "Batch update successful";

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::bad_request("body", e.body_text()))
}

fn path<T>(field: &str, param: Result<Path<T>, PathRejection>) -> ApiResult<T> {
    param
        .map(|Path(v)| v)
        .map_err(|e| ApiError::bad_request(field, e.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    params
        .map(|Query(v)| v)
        .map_err(|e| ApiError::bad_request("query", e.body_text()))
}

/// `POST /api/v1/tasks/project/{projectId}`
pub async fn create_task(
    State(state): State<AppState>,
    project_id: Result<Path<ProjectId>, PathRejection>,
    payload: Result<Json<TaskDto>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskDto>)> {
    let project_id = path("projectId", project_id)?;
    let dto = body(payload)?;
    let created = state.service.create(project_id, &dto)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/v1/tasks/{taskId}`
pub async fn update_task(
    State(state): State<AppState>,
    task_id: Result<Path<TaskId>, PathRejection>,
    payload: Result<Json<TaskDto>, JsonRejection>,
) -> ApiResult<Json<TaskDto>> {
    let task_id = path("taskId", task_id)?;
    let dto = body(payload)?;
    Ok(Json(state.service.update(task_id, &dto)?))
}

/// `DELETE /api/v1/tasks/{taskId}`
pub async fn delete_task(
    State(state): State<AppState>,
    task_id: Result<Path<TaskId>, PathRejection>,
) -> ApiResult<&'static str> {
    let task_id = path("taskId", task_id)?;
    state.service.delete(task_id)?;
    Ok(TASK_DELETED)
}

/// `GET /api/v1/tasks/{taskId}`
pub async fn get_task(
    State(state): State<AppState>,
    task_id: Result<Path<TaskId>, PathRejection>,
) -> ApiResult<Json<TaskDto>> {
    let task_id = path("taskId", task_id)?;
    Ok(Json(state.service.get_by_id(task_id)?))
}

/// `GET /api/v1/tasks?page=&size=&sortBy=`
pub async fn list_tasks(
    State(state): State<AppState>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TaskDto>>> {
    let q = query(params)?;
    let params = ListParams {
        page: q.page,
        size: q.size,
        sort_by: q.sort_by,
    };
    Ok(Json(state.service.list_all(&params)?))
}

/// `GET /api/v1/tasks/over-due`
pub async fn list_overdue(State(state): State<AppState>) -> ApiResult<Json<Vec<TaskDto>>> {
    Ok(Json(state.service.list_overdue()?))
}

/// `GET /api/v1/tasks/project/{projectId}[?status=]`
pub async fn list_by_project(
    State(state): State<AppState>,
    project_id: Result<Path<ProjectId>, PathRejection>,
    params: Result<Query<StatusQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TaskDto>>> {
    let project_id = path("projectId", project_id)?;
    let tasks = match query(params)?.status {
        Some(status) => state.service.list_by_project_and_status(project_id, &status)?,
        None => state.service.list_by_project(project_id)?,
    };
    Ok(Json(tasks))
}

/// `GET /api/v1/tasks/project/{projectId}/completed-after/{dueDate}`
pub async fn list_completed_after(
    State(state): State<AppState>,
    params: Result<Path<(ProjectId, String)>, PathRejection>,
) -> ApiResult<Json<Vec<TaskDto>>> {
    let (project_id, raw_date) = path("projectId", params)?;
    let due_date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d").map_err(|_| {
        ApiError::bad_request("dueDate", format!("Invalid date '{raw_date}', expected YYYY-MM-DD"))
    })?;
    Ok(Json(state.service.list_completed_after(project_id, due_date)?))
}

/// `PUT /api/v1/tasks/batch-status-updates`
pub async fn batch_update_status(
    State(state): State<AppState>,
    payload: Result<Json<BatchStatusUpdate>, JsonRejection>,
) -> ApiResult<&'static str> {
    let request = body(payload)?;
    state.service.batch_update_status(&request)?;
    Ok(BATCH_UPDATED)
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.db.ping() {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "healthy" }))),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy" })),
            )
        }
    }
}
