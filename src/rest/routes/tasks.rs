// rest/routes/tasks.rs — Task CRUD routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::tasks::{Task, TaskError};
use crate::AppContext;

/// Request body for POST /tasks and PUT /tasks/{id}.
/// Fields are optional so that a missing field reads as an empty value and
/// fails validation with 400 rather than a deserialization rejection.
#[derive(Deserialize)]
pub struct TaskBody {
    pub title: Option<String>,
    pub description: Option<String>,
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<TaskBody>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, Json<Value>)> {
    let title = body.title.unwrap_or_default();
    let description = body.description.unwrap_or_default();
    match ctx.tasks.create(&title, &description).await {
        Ok(task) => Ok((StatusCode::CREATED, Json(task))),
        Err(e) => Err(error_response("create task", e)),
    }
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Vec<Task>>, (StatusCode, Json<Value>)> {
    match ctx.tasks.list().await {
        Ok(tasks) => Ok(Json(tasks)),
        Err(TaskError::NotFound) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No tasks found" })),
        )),
        Err(e) => Err(error_response("retrieve tasks", e)),
    }
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, (StatusCode, Json<Value>)> {
    match ctx.tasks.get_by_id(&id).await {
        Ok(task) => Ok(Json(task)),
        Err(e) => Err(error_response("retrieve task", e)),
    }
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    Json(body): Json<TaskBody>,
) -> Result<Json<Task>, (StatusCode, Json<Value>)> {
    let title = body.title.unwrap_or_default();
    let description = body.description.unwrap_or_default();
    match ctx.tasks.update_by_id(&id, &title, &description).await {
        Ok(task) => Ok(Json(task)),
        Err(e) => Err(error_response("update task", e)),
    }
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match ctx.tasks.delete_by_id(&id).await {
        Ok(()) => Ok(Json(json!({ "message": "Task deleted successfully" }))),
        Err(e) => Err(error_response("delete task", e)),
    }
}

/// Map a service error to an HTTP status + JSON error body.
/// Store failures are logged here with their full cause chain; the client
/// only ever sees a generic message.
fn error_response(op: &str, err: TaskError) -> (StatusCode, Json<Value>) {
    match err {
        TaskError::Validation(msg) => (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))),
        TaskError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Task not found" })),
        ),
        err => {
            error!(err = ?err, "failed to {op}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("Failed to {op}") })),
            )
        }
    }
}
