use serde::{Deserialize, Serialize};
use validator::Validate;

// ----------------- User Request -----------------
#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Deserialize, Serialize, Debug, Default, Validate)]
#[serde(default)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

// ----------------- Tag Request -----------------
#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug, Default, Validate)]
#[serde(default)]
pub struct UpdateTagRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
}

// ----------------- Post Request -----------------
#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub content: String,
    pub author_id: i64,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

#[derive(Deserialize, Serialize, Debug, Default, Validate)]
#[serde(default)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub content: Option<String>,
    pub tag_ids: Option<Vec<i64>>,
}

// ----------------- Comment Request -----------------
/// Body of `POST /comments/post/:post_id`; the post comes from the path.
#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct CreatePostCommentRequest {
    #[validate(length(min = 1))]
    pub content: String,
    pub author_id: i64,
}

#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1))]
    pub content: String,
    pub author_id: i64,
    pub post_id: i64,
}

#[derive(Deserialize, Serialize, Debug, Default, Validate)]
#[serde(default)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1))]
    pub content: Option<String>,
}
