#![allow(dead_code)]

use blog_api::{bind_listener, init_db, make_router, run_app};
use reqwest::{Client, Response};
use serde_json::Value;
use tempfile::TempDir;

pub struct TestApp {
    pub address: String,
    pub client: Client,
    _dir: TempDir,
}

/// Serves the real router on a random local port over a fresh database.
pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("blog.db").display());
    let db = init_db(&url).await.unwrap();
    let (addr, listener) = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
    tokio::spawn(run_app(make_router(), listener, db));
    TestApp {
        address: format!("http://{}", addr),
        client: Client::new(),
        _dir: dir,
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post(&self, path: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn post_empty(&self, path: &str) -> Response {
        self.client.post(self.url(path)).send().await.unwrap()
    }

    pub async fn put(&self, path: &str, body: Value) -> Response {
        self.client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client.delete(self.url(path)).send().await.unwrap()
    }

    pub async fn create_user(&self, username: &str) -> i64 {
        let response = self
            .post(
                "/users",
                serde_json::json!({ "username": username, "email": format!("{username}@x.com") }),
            )
            .await;
        assert_eq!(response.status(), 201);
        response.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
    }

    pub async fn create_tag(&self, name: &str) -> i64 {
        let response = self.post("/tags", serde_json::json!({ "name": name })).await;
        assert_eq!(response.status(), 201);
        response.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
    }

    pub async fn create_post(&self, author_id: i64, tag_ids: &[i64]) -> i64 {
        let response = self
            .post(
                "/posts",
                serde_json::json!({
                    "title": "Hi",
                    "content": "...",
                    "author_id": author_id,
                    "tag_ids": tag_ids,
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        response.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
    }
}

pub async fn error_message(response: Response) -> String {
    let body: blog_api::RequestErrorJsonWrapper = response.json().await.unwrap();
    body.errors.body.join(", ")
}
