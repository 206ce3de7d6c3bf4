//! Integration tests for the task CRUD HTTP surface.
//! Spins up the real server on a random port and drives it with an HTTP client.

use serde_json::{json, Value};
use std::sync::Arc;
use taskd::{config::TaskdConfig, rest, store::Store, AppContext};
use tempfile::TempDir;
use uuid::Uuid;

/// Find a free local port by binding to port 0.
fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    _dir: TempDir,
}

/// Start a server on a random port with a fresh data dir and wait until it
/// answers /health.
async fn spawn_server() -> TestServer {
    let dir = TempDir::new().unwrap();
    let port = find_free_port();
    let config = TaskdConfig::new(
        Some(port),
        Some(dir.path().to_path_buf()),
        Some("error".to_string()),
        Some("127.0.0.1".to_string()),
    );
    let store = Store::new(&config.data_dir).await.unwrap();
    let ctx = Arc::new(AppContext::new(config, store));

    tokio::spawn(async move {
        let _ = rest::start_rest_server(ctx).await;
    });

    let base = format!("http://127.0.0.1:{port}");
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if client.get(format!("{base}/health")).send().await.is_ok() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    TestServer {
        base,
        client,
        _dir: dir,
    }
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn create(&self, title: &str, description: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/tasks"))
            .json(&json!({ "title": title, "description": description }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }
}

#[tokio::test]
async fn health_reports_status_and_version() {
    let server = spawn_server().await;
    let resp = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["uptime_secs"].is_number());
    assert_eq!(body["version"].as_str().unwrap(), env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn create_with_empty_title_is_400() {
    let server = spawn_server().await;
    let resp = server
        .client
        .post(server.url("/tasks"))
        .json(&json!({ "title": "", "description": "something" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn create_with_missing_title_field_is_400() {
    let server = spawn_server().await;
    let resp = server
        .client
        .post(server.url("/tasks"))
        .json(&json!({ "description": "no title at all" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn created_task_is_retrievable() {
    let server = spawn_server().await;
    let created = server.create("buy milk", "two liters").await;

    let id = created["id"].as_str().unwrap();
    assert!(Uuid::parse_str(id).is_ok(), "id should be a valid UUID");
    assert_eq!(created["title"], "buy milk");
    assert_eq!(created["description"], "two liters");

    let resp = server
        .client
        .get(server.url(&format!("/tasks/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let fetched: Value = resp.json().await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_nonexistent_task_is_404() {
    let server = spawn_server().await;
    let resp = server
        .client
        .get(server.url("/tasks/no-such-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Task not found");
}

#[tokio::test]
async fn put_nonexistent_task_is_404() {
    let server = spawn_server().await;
    let resp = server
        .client
        .put(server.url("/tasks/no-such-id"))
        .json(&json!({ "title": "t", "description": "d" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn put_replaces_fields_and_preserves_id() {
    let server = spawn_server().await;
    let created = server.create("old title", "old description").await;
    let id = created["id"].as_str().unwrap();

    let resp = server
        .client
        .put(server.url(&format!("/tasks/{id}")))
        .json(&json!({ "title": "new title", "description": "new description" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["title"], "new title");
    assert_eq!(updated["description"], "new description");
}

#[tokio::test]
async fn put_with_empty_title_is_400() {
    let server = spawn_server().await;
    let created = server.create("a title", "a description").await;
    let id = created["id"].as_str().unwrap();

    let resp = server
        .client
        .put(server.url(&format!("/tasks/{id}")))
        .json(&json!({ "title": "", "description": "still here" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn delete_removes_the_task() {
    let server = spawn_server().await;
    let created = server.create("ephemeral", "soon gone").await;
    let id = created["id"].as_str().unwrap();

    let resp = server
        .client
        .delete(server.url(&format!("/tasks/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Task deleted successfully");

    let resp = server
        .client
        .get(server.url(&format!("/tasks/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Deleting again reports not found.
    let resp = server
        .client
        .delete(server.url(&format!("/tasks/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn list_with_no_tasks_is_404() {
    let server = spawn_server().await;
    let resp = server
        .client
        .get(server.url("/tasks"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No tasks found");
}

#[tokio::test]
async fn list_returns_every_task() {
    let server = spawn_server().await;
    let mut ids = vec![
        server.create("one", "first").await["id"].as_str().unwrap().to_string(),
        server.create("two", "second").await["id"].as_str().unwrap().to_string(),
        server.create("three", "third").await["id"].as_str().unwrap().to_string(),
    ];

    let resp = server
        .client
        .get(server.url("/tasks"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let listed: Vec<Value> = resp.json().await.unwrap();
    let mut listed_ids: Vec<String> = listed
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    listed_ids.sort();
    assert_eq!(listed_ids, ids);
}
