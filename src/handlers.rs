use std::sync::Arc;

use axum::{
    http::{StatusCode, Uri},
    Extension, Json,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    data_formats::{
        non_empty, CommentResponse, CreateCommentRequest, CreatePostCommentRequest,
        CreatePostRequest, CreateTagRequest, CreateUserRequest, PostQueryParams, PostResponse,
        TagResponse, UpdateCommentRequest, UpdatePostRequest, UpdateTagRequest,
        UpdateUserRequest, UserQueryParams, UserResponse,
    },
    db_helpers::*,
    errors::{RequestError, RequestErrorJsonWrapper},
    extractors::{ValidJson, ValidPath, ValidQuery},
    JsonResponse,
};

type Pool = Extension<Arc<SqlitePool>>;

type JsonResult<T> = Result<Json<T>, RequestError>;
type CreatedResult<T> = Result<JsonResponse<T>, RequestError>;

// ----------------- Helper Handlers -----------------
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn not_found(uri: Uri) -> JsonResponse<RequestErrorJsonWrapper> {
    (
        StatusCode::NOT_FOUND,
        Json(RequestErrorJsonWrapper::new(&format!(
            "URL {} provided was not found",
            uri
        ))),
    )
}

// ----------------- User Handlers -----------------
pub async fn create_user(
    Extension(pool): Pool,
    ValidJson(request): ValidJson<CreateUserRequest>,
) -> CreatedResult<UserResponse> {
    let user = insert_user_in_db(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::new(user))))
}

pub async fn list_users(
    Extension(pool): Pool,
    ValidQuery(UserQueryParams { q }): ValidQuery<UserQueryParams>,
) -> JsonResult<Vec<UserResponse>> {
    let users = list_users_in_db(&pool, non_empty(q)).await?;
    Ok(Json(users.into_iter().map(UserResponse::new).collect()))
}

pub async fn get_user(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
) -> JsonResult<UserResponse> {
    let user = get_user_in_db(&pool, id).await?;
    Ok(Json(UserResponse::new(user)))
}

pub async fn update_user(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
    ValidJson(request): ValidJson<UpdateUserRequest>,
) -> JsonResult<UserResponse> {
    let user = update_user_in_db(&pool, id, request).await?;
    Ok(Json(UserResponse::new(user)))
}

pub async fn delete_user(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, RequestError> {
    delete_user_in_db(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_user_posts(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
) -> JsonResult<Vec<PostResponse>> {
    let posts = list_posts_by_author_in_db(&pool, id).await?;
    Ok(Json(posts.into_iter().map(PostResponse::new).collect()))
}
// ----------------- End User Handlers -----------------

// ----------------- Post Handlers -----------------
pub async fn create_post(
    Extension(pool): Pool,
    ValidJson(request): ValidJson<CreatePostRequest>,
) -> CreatedResult<PostResponse> {
    let post = insert_post_in_db(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(PostResponse::new(post))))
}

pub async fn list_posts(
    Extension(pool): Pool,
    ValidQuery(PostQueryParams { tag }): ValidQuery<PostQueryParams>,
) -> JsonResult<Vec<PostResponse>> {
    let posts = list_posts_in_db(&pool, non_empty(tag)).await?;
    Ok(Json(posts.into_iter().map(PostResponse::new).collect()))
}

pub async fn get_post(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
) -> JsonResult<PostResponse> {
    let post = get_post_in_db(&pool, id).await?;
    Ok(Json(PostResponse::new(post)))
}

pub async fn update_post(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
    ValidJson(request): ValidJson<UpdatePostRequest>,
) -> JsonResult<PostResponse> {
    let post = update_post_in_db(&pool, id, request).await?;
    Ok(Json(PostResponse::new(post)))
}

pub async fn delete_post(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, RequestError> {
    delete_post_in_db(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_post_comments(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
) -> JsonResult<Vec<CommentResponse>> {
    let comments = get_comments_for_post_in_db(&pool, id).await?;
    Ok(Json(comments.into_iter().map(CommentResponse::new).collect()))
}

pub async fn attach_tag_to_post(
    Extension(pool): Pool,
    ValidPath((post_id, tag_id)): ValidPath<(i64, i64)>,
) -> JsonResult<PostResponse> {
    let post = attach_tag_to_post_in_db(&pool, post_id, tag_id).await?;
    Ok(Json(PostResponse::new(post)))
}
// ----------------- End Post Handlers -----------------

// ----------------- Comment Handlers -----------------
pub async fn create_comment_for_post(
    Extension(pool): Pool,
    ValidPath(post_id): ValidPath<i64>,
    ValidJson(request): ValidJson<CreatePostCommentRequest>,
) -> CreatedResult<CommentResponse> {
    let comment = add_comment_to_post_in_db(&pool, post_id, request).await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::new(comment))))
}

pub async fn create_comment(
    Extension(pool): Pool,
    ValidJson(request): ValidJson<CreateCommentRequest>,
) -> CreatedResult<CommentResponse> {
    let comment = insert_comment_in_db(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::new(comment))))
}

pub async fn list_comments(Extension(pool): Pool) -> JsonResult<Vec<CommentResponse>> {
    let comments = list_comments_in_db(&pool).await?;
    Ok(Json(comments.into_iter().map(CommentResponse::new).collect()))
}

pub async fn get_comment(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
) -> JsonResult<CommentResponse> {
    let comment = get_comment_in_db(&pool, id).await?;
    Ok(Json(CommentResponse::new(comment)))
}

pub async fn update_comment(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
    ValidJson(request): ValidJson<UpdateCommentRequest>,
) -> JsonResult<CommentResponse> {
    let comment = update_comment_in_db(&pool, id, request).await?;
    Ok(Json(CommentResponse::new(comment)))
}

pub async fn delete_comment(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, RequestError> {
    delete_comment_in_db(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
// ----------------- End Comment Handlers -----------------

// ----------------- Tag Handlers -----------------
pub async fn create_tag(
    Extension(pool): Pool,
    ValidJson(request): ValidJson<CreateTagRequest>,
) -> CreatedResult<TagResponse> {
    let tag = insert_tag_in_db(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(TagResponse::new(tag))))
}

pub async fn list_tags(Extension(pool): Pool) -> JsonResult<Vec<TagResponse>> {
    let tags = list_tags_in_db(&pool).await?;
    Ok(Json(tags.into_iter().map(TagResponse::new).collect()))
}

pub async fn get_tag(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
) -> JsonResult<TagResponse> {
    let tag = get_tag_in_db(&pool, id).await?;
    Ok(Json(TagResponse::new(tag)))
}

pub async fn update_tag(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
    ValidJson(request): ValidJson<UpdateTagRequest>,
) -> JsonResult<TagResponse> {
    let tag = update_tag_in_db(&pool, id, request).await?;
    Ok(Json(TagResponse::new(tag)))
}

pub async fn delete_tag(
    Extension(pool): Pool,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, RequestError> {
    delete_tag_in_db(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
// ----------------- End Tag Handlers -----------------
