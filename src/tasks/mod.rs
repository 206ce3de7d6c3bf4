use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::store::Store;

/// Maximum id-generation attempts before giving up.
/// A v4 UUID collision is vanishingly unlikely; the cap exists so a
/// degenerate generator cannot loop forever.
const MAX_ID_ATTEMPTS: u32 = 8;

/// The sole persisted entity: a title/description pair under a generated id.
/// Stored as a JSON-encoded value with key = id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum TaskError {
    /// Input failed a presence/non-emptiness check. Maps to 400.
    #[error("{0}")]
    Validation(String),
    /// No task stored under the requested id. Maps to 404.
    #[error("task not found")]
    NotFound,
    /// Id generation exhausted its attempt budget. Maps to 500.
    #[error("task id generation failed after {MAX_ID_ATTEMPTS} attempts")]
    IdExhausted,
    /// The underlying store failed. Maps to 500; details are logged, never
    /// returned to the client.
    #[error("store unavailable")]
    Store(#[from] anyhow::Error),
}

/// Maps task operations onto the key-value store.
///
/// No locking around read-modify-write: concurrent updates to the same id
/// race and the last write wins.
pub struct TaskService {
    store: Arc<Store>,
}

impl TaskService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Create a task under a freshly generated id and persist it.
    pub async fn create(&self, title: &str, description: &str) -> Result<Task, TaskError> {
        validate(title, description)?;
        let task = Task {
            id: self.generate_id().await?,
            title: title.to_string(),
            description: description.to_string(),
        };
        self.store.set(&task.id, &encode(&task)?).await?;
        Ok(task)
    }

    /// Fetch every stored task.
    ///
    /// Entries that fail to parse are skipped with a warning rather than
    /// failing the whole listing. Zero stored keys is reported as `NotFound`.
    pub async fn list(&self) -> Result<Vec<Task>, TaskError> {
        let keys = self.store.keys("*").await?;
        if keys.is_empty() {
            return Err(TaskError::NotFound);
        }
        let values = self.store.multi_get(&keys).await?;
        let mut tasks = Vec::with_capacity(values.len());
        for (key, value) in keys.iter().zip(values) {
            let Some(value) = value else {
                // Deleted between keys() and multi_get() — racing deletes are allowed.
                continue;
            };
            match serde_json::from_str::<Task>(&value) {
                Ok(task) => tasks.push(task),
                Err(e) => warn!(key, err = %e, "skipping unparseable task record"),
            }
        }
        Ok(tasks)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Task, TaskError> {
        let value = self.store.get(id).await?.ok_or(TaskError::NotFound)?;
        Ok(decode(id, &value)?)
    }

    /// Replace the title/description of an existing task, preserving its id.
    pub async fn update_by_id(
        &self,
        id: &str,
        title: &str,
        description: &str,
    ) -> Result<Task, TaskError> {
        validate(title, description)?;
        let value = self.store.get(id).await?.ok_or(TaskError::NotFound)?;
        let mut task = decode(id, &value)?;
        task.title = title.to_string();
        task.description = description.to_string();
        self.store.set(&task.id, &encode(&task)?).await?;
        Ok(task)
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<(), TaskError> {
        if self.store.delete(id).await? == 0 {
            return Err(TaskError::NotFound);
        }
        Ok(())
    }

    /// Generate a fresh id, retrying while the store already holds the key.
    async fn generate_id(&self) -> Result<String, TaskError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = Uuid::new_v4().to_string();
            if self.store.get(&id).await?.is_none() {
                return Ok(id);
            }
            warn!(%id, "task id collision, regenerating");
        }
        Err(TaskError::IdExhausted)
    }
}

fn validate(title: &str, description: &str) -> Result<(), TaskError> {
    if title.is_empty() {
        return Err(TaskError::Validation("title is required".to_string()));
    }
    if description.is_empty() {
        return Err(TaskError::Validation("description is required".to_string()));
    }
    Ok(())
}

fn encode(task: &Task) -> Result<String, TaskError> {
    serde_json::to_string(task)
        .map_err(|e| TaskError::Store(anyhow::Error::from(e).context("failed to encode task")))
}

fn decode(key: &str, value: &str) -> Result<Task, TaskError> {
    serde_json::from_str(value).map_err(|e| {
        TaskError::Store(
            anyhow::Error::from(e).context(format!("stored record under '{key}' is not a task")),
        )
    })
}
