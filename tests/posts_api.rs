mod common;

use blog_api::{CommentResponse, PostResponse, TagResponse};
use common::{error_message, spawn_app};
use serde_json::json;

fn tag_ids(post: &PostResponse) -> Vec<i64> {
    post.tags.iter().map(|tag| tag.id).collect()
}

#[tokio::test]
async fn blog_scenario_user_delete_cascades_but_tags_survive() {
    let app = spawn_app().await;

    let response = app
        .post("/users", json!({ "username": "ada", "email": "ada@x.com" }))
        .await;
    assert_eq!(response.status(), 201);

    let response = app.post("/tags", json!({ "name": "rust" })).await;
    assert_eq!(response.status(), 201);
    let tag: TagResponse = response.json().await.unwrap();
    assert_eq!(tag.id, 1);

    let response = app
        .post(
            "/posts",
            json!({ "title": "Hi", "content": "...", "author_id": 1, "tag_ids": [1] }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let post: PostResponse = response.json().await.unwrap();
    assert_eq!(
        post.tags,
        vec![TagResponse {
            id: 1,
            name: "rust".into()
        }]
    );

    assert_eq!(app.delete("/users/1").await.status(), 204);
    assert_eq!(app.get("/posts/1").await.status(), 404);
    assert_eq!(app.get("/tags/1").await.status(), 200);
}

#[tokio::test]
async fn create_post_checks_references() {
    let app = spawn_app().await;
    let ada = app.create_user("ada").await;
    let rust = app.create_tag("rust").await;

    let response = app
        .post(
            "/posts",
            json!({ "title": "Hi", "content": "...", "author_id": ada + 1 }),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "Invalid author_id");

    let response = app
        .post(
            "/posts",
            json!({ "title": "Hi", "content": "...", "author_id": ada, "tag_ids": [rust, 77] }),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(error_message(response).await, "Some tag_ids do not exist");

    let posts: Vec<PostResponse> = app.get("/posts").await.json().await.unwrap();
    assert!(posts.is_empty());
}

#[tokio::test]
async fn empty_title_is_a_validation_error() {
    let app = spawn_app().await;
    let ada = app.create_user("ada").await;
    let response = app
        .post(
            "/posts",
            json!({ "title": "", "content": "...", "author_id": ada }),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn update_replaces_tags_and_rejects_unknown_ids() {
    let app = spawn_app().await;
    let ada = app.create_user("ada").await;
    let rust = app.create_tag("rust").await;
    let sql = app.create_tag("sql").await;
    let id = app.create_post(ada, &[rust]).await;

    let response = app
        .put(&format!("/posts/{id}"), json!({ "tag_ids": [sql, 404] }))
        .await;
    assert_eq!(response.status(), 400);
    let post: PostResponse = app.get(&format!("/posts/{id}")).await.json().await.unwrap();
    assert_eq!(tag_ids(&post), vec![rust]);

    let response = app
        .put(&format!("/posts/{id}"), json!({ "title": "Renamed", "tag_ids": [sql] }))
        .await;
    assert_eq!(response.status(), 200);
    let post: PostResponse = response.json().await.unwrap();
    assert_eq!(post.title, "Renamed");
    assert_eq!(post.content, "...");
    assert_eq!(tag_ids(&post), vec![sql]);

    let response = app.put(&format!("/posts/{id}"), json!({ "tag_ids": [] })).await;
    let post: PostResponse = response.json().await.unwrap();
    assert!(post.tags.is_empty());

    let response = app.put(&format!("/posts/{id}"), json!({ "content": "new" })).await;
    let post: PostResponse = response.json().await.unwrap();
    assert!(post.tags.is_empty());
    assert_eq!(post.title, "Renamed");
}

#[tokio::test]
async fn list_filters_by_exact_tag_name() {
    let app = spawn_app().await;
    let ada = app.create_user("ada").await;
    let foo = app.create_tag("foo").await;
    let bar = app.create_tag("bar").await;
    let tagged = app.create_post(ada, &[foo, bar]).await;
    app.create_post(ada, &[bar]).await;
    app.create_post(ada, &[]).await;

    let posts: Vec<PostResponse> = app.get("/posts?tag=foo").await.json().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, tagged);
    assert_eq!(tag_ids(&posts[0]), vec![foo, bar]);

    let response = app.get("/posts?tag=missing").await;
    assert_eq!(response.status(), 200);
    let posts: Vec<PostResponse> = response.json().await.unwrap();
    assert!(posts.is_empty());

    let posts: Vec<PostResponse> = app.get("/posts").await.json().await.unwrap();
    assert_eq!(posts.len(), 3);
}

#[tokio::test]
async fn attach_tag_is_idempotent() {
    let app = spawn_app().await;
    let ada = app.create_user("ada").await;
    let rust = app.create_tag("rust").await;
    let id = app.create_post(ada, &[]).await;

    for _ in 0..2 {
        let response = app.post_empty(&format!("/posts/{id}/tags/{rust}")).await;
        assert_eq!(response.status(), 200);
        let post: PostResponse = response.json().await.unwrap();
        assert_eq!(tag_ids(&post), vec![rust]);
    }

    let response = app.post_empty(&format!("/posts/{id}/tags/99")).await;
    assert_eq!(response.status(), 404);
    assert_eq!(error_message(response).await, "Tag not found");

    let response = app.post_empty(&format!("/posts/99/tags/{rust}")).await;
    assert_eq!(response.status(), 404);
    assert_eq!(error_message(response).await, "Post not found");
}

#[tokio::test]
async fn delete_post_removes_comments_and_links_but_not_tags() {
    let app = spawn_app().await;
    let ada = app.create_user("ada").await;
    let rust = app.create_tag("rust").await;
    let id = app.create_post(ada, &[rust]).await;
    let response = app
        .post(
            &format!("/comments/post/{id}"),
            json!({ "content": "first!", "author_id": ada }),
        )
        .await;
    let comment: CommentResponse = response.json().await.unwrap();

    assert_eq!(app.delete(&format!("/posts/{id}")).await.status(), 204);
    assert_eq!(app.get(&format!("/posts/{id}")).await.status(), 404);
    assert_eq!(app.get(&format!("/posts/{id}/comments")).await.status(), 404);
    assert_eq!(
        app.get(&format!("/comments/{}", comment.id)).await.status(),
        404
    );
    assert_eq!(app.get(&format!("/tags/{rust}")).await.status(), 200);
    assert_eq!(app.delete(&format!("/posts/{id}")).await.status(), 404);
}

#[tokio::test]
async fn malformed_post_and_tag_ids_get_json_errors() {
    let app = spawn_app().await;
    let ada = app.create_user("ada").await;
    let post = app.create_post(ada, &[]).await;

    let response = app.get("/posts/99999999999999999999").await;
    assert_eq!(response.status(), 400);
    assert!(!error_message(response).await.is_empty());

    let response = app.post_empty(&format!("/posts/{post}/tags/x")).await;
    assert_eq!(response.status(), 400);
    assert!(!error_message(response).await.is_empty());

    let response = app
        .put("/posts/abc", json!({ "title": "New" }))
        .await;
    assert_eq!(response.status(), 400);
    assert!(!error_message(response).await.is_empty());
}
