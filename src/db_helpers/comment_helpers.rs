use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::{
    data_formats::{CreateCommentRequest, CreatePostCommentRequest, UpdateCommentRequest},
    errors::RequestError,
    models::Comment,
};

use super::{post_exists, user_exists, QueryBuilder, WriteTransaction};

const COMMENT_QUERY: &str = r#"
        SELECT id, content, created_at, author_id, post_id FROM comments
"#;

async fn find_comment(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<Sqlite, Comment>(&format!("{COMMENT_QUERY} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

async fn insert_comment(
    conn: &mut SqliteConnection,
    content: String,
    author_id: i64,
    post_id: i64,
) -> Result<Comment, RequestError> {
    if !user_exists(conn, author_id).await? {
        return Err(RequestError::InvalidReference("Invalid author_id"));
    }
    let comment = sqlx::query_as::<Sqlite, Comment>(
        r#"
        INSERT INTO comments (content, created_at, author_id, post_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id, content, created_at, author_id, post_id
        "#,
    )
    .bind(content)
    .bind(Utc::now())
    .bind(author_id)
    .bind(post_id)
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!("Created comment {} on post {}", comment.id, post_id);
    Ok(comment)
}

// ----------------- Comment Queries -----------------

/// Comments under a post addressed by the path; a missing post is `NotFound`.
pub async fn add_comment_to_post_in_db(
    pool: &SqlitePool,
    post_id: i64,
    CreatePostCommentRequest { content, author_id }: CreatePostCommentRequest,
) -> Result<Comment, RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result: Result<_, RequestError> = async {
        if !post_exists(&mut tx, post_id).await? {
            return Err(RequestError::NotFound("Post not found"));
        }
        insert_comment(&mut tx, content, author_id, post_id).await
    }
    .await;
    tx.finish(result).await
}

/// Generic create; the post is just another reference, so a missing one is
/// `InvalidReference`.
pub async fn insert_comment_in_db(
    pool: &SqlitePool,
    CreateCommentRequest {
        content,
        author_id,
        post_id,
    }: CreateCommentRequest,
) -> Result<Comment, RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result: Result<_, RequestError> = async {
        if !post_exists(&mut tx, post_id).await? {
            return Err(RequestError::InvalidReference("Invalid post_id"));
        }
        insert_comment(&mut tx, content, author_id, post_id).await
    }
    .await;
    tx.finish(result).await
}

pub async fn list_comments_in_db(pool: &SqlitePool) -> Result<Vec<Comment>, RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query_as::<Sqlite, Comment>(&format!("{COMMENT_QUERY} ORDER BY id"))
        .fetch_all(&mut tx)
    .await?;
    tx.commit().await?;
    Ok(result)
}

pub async fn get_comments_for_post_in_db(
    pool: &SqlitePool,
    post_id: i64,
) -> Result<Vec<Comment>, RequestError> {
    let mut tx = pool.begin().await?;
    if !post_exists(&mut tx, post_id).await? {
        return Err(RequestError::NotFound("Post not found"));
    }
    let result = sqlx::query_as::<Sqlite, Comment>(&format!(
        "{COMMENT_QUERY} WHERE post_id = $1 ORDER BY id"
    ))
    .bind(post_id)
    .fetch_all(&mut tx)
    .await?;
    tx.commit().await?;
    Ok(result)
}

pub async fn get_comment_in_db(pool: &SqlitePool, id: i64) -> Result<Comment, RequestError> {
    let mut tx = pool.begin().await?;
    let result = find_comment(&mut tx, id).await?;
    tx.commit().await?;
    result.ok_or(RequestError::NotFound("Comment not found"))
}

pub async fn update_comment_in_db(
    pool: &SqlitePool,
    id: i64,
    UpdateCommentRequest { content }: UpdateCommentRequest,
) -> Result<Comment, RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result: Result<_, RequestError> = async {
        if find_comment(&mut tx, id).await?.is_none() {
            return Err(RequestError::NotFound("Comment not found"));
        }

        QueryBuilder::new("comments")
            .add_param("content", content)
            .execute(&mut tx, id)
            .await?;

        let comment = sqlx::query_as::<Sqlite, Comment>(&format!("{COMMENT_QUERY} WHERE id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        Ok(comment)
    }
    .await;
    tx.finish(result).await
}

pub async fn delete_comment_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result = sqlx::query(
        r#"
        DELETE FROM comments WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(RequestError::from)
    .and_then(|done| match done.rows_affected() {
        0 => Err(RequestError::NotFound("Comment not found")),
        _ => Ok(()),
    });
    tx.finish(result).await
}
