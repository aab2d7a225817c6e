use std::collections::BTreeSet;

use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::{
    data_formats::{CreatePostRequest, UpdatePostRequest},
    errors::RequestError,
    models::{Post, PostWithTags},
};

use super::{
    attach_tags, find_tag, load_tags, post_exists, tag_exists, user_exists, QueryBuilder,
    WriteTransaction,
};

const POST_QUERY: &str = r#"
        SELECT id, title, content, created_at, author_id FROM posts
"#;

async fn find_post(conn: &mut SqliteConnection, id: i64) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<Sqlite, Post>(&format!("{POST_QUERY} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

async fn find_post_with_tags(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<PostWithTags>, sqlx::Error> {
    match find_post(conn, id).await? {
        Some(post) => Ok(Some(load_tags(conn, post).await?)),
        None => Ok(None),
    }
}

/// Re-reads a post known to exist inside the current write transaction.
async fn reload_post(conn: &mut SqliteConnection, id: i64) -> Result<PostWithTags, sqlx::Error> {
    let post = sqlx::query_as::<Sqlite, Post>(&format!("{POST_QUERY} WHERE id = $1"))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    load_tags(conn, post).await
}

/// Collapses duplicates and checks every id against `tags`. Fails before any
/// write so a bad list leaves the post untouched.
async fn ensure_tags_exist(
    conn: &mut SqliteConnection,
    tag_ids: &[i64],
) -> Result<Vec<i64>, RequestError> {
    let distinct: BTreeSet<i64> = tag_ids.iter().copied().collect();
    for id in &distinct {
        if !tag_exists(conn, *id).await? {
            return Err(RequestError::InvalidReference("Some tag_ids do not exist"));
        }
    }
    Ok(distinct.into_iter().collect())
}

/// Replaces the whole association set: delete everything, then insert the new list.
async fn replace_post_tags(
    conn: &mut SqliteConnection,
    post_id: i64,
    tag_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;
    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES ($1, $2)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

// ----------------- Post Queries -----------------

pub async fn insert_post_in_db(
    pool: &SqlitePool,
    CreatePostRequest {
        title,
        content,
        author_id,
        tag_ids,
    }: CreatePostRequest,
) -> Result<PostWithTags, RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result: Result<_, RequestError> = async {
        if !user_exists(&mut tx, author_id).await? {
            return Err(RequestError::InvalidReference("Invalid author_id"));
        }
        let tag_ids = ensure_tags_exist(&mut tx, &tag_ids).await?;

        let post = sqlx::query_as::<Sqlite, Post>(
            r#"
            INSERT INTO posts (title, content, created_at, author_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, content, created_at, author_id
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(Utc::now())
        .bind(author_id)
        .fetch_one(&mut *tx)
        .await?;

        replace_post_tags(&mut tx, post.id, &tag_ids).await?;
        Ok(load_tags(&mut tx, post).await?)
    }
    .await;
    let post = tx.finish(result).await?;

    tracing::debug!("Created post {} with {} tags", post.post.id, post.tags.len());
    Ok(post)
}

/// Lists posts by id; `tag` keeps only posts linked to a tag with exactly that name.
pub async fn list_posts_in_db(
    pool: &SqlitePool,
    tag: Option<String>,
) -> Result<Vec<PostWithTags>, RequestError> {
    let mut tx = pool.begin().await?;
    let posts = sqlx::query_as::<Sqlite, Post>(&format!(
        r#"{POST_QUERY}
        WHERE ($1 IS NULL OR EXISTS (SELECT 1
                                     FROM   post_tags
                                            JOIN tags
                                              ON tags.id = post_tags.tag_id
                                     WHERE  post_tags.post_id = posts.id
                                            AND tags.name = $1))
        ORDER BY id
        "#
    ))
    .bind(tag)
    .fetch_all(&mut tx)
    .await?;

    let result = attach_tags(&mut tx, posts).await?;
    tx.commit().await?;
    Ok(result)
}

pub async fn list_posts_by_author_in_db(
    pool: &SqlitePool,
    author_id: i64,
) -> Result<Vec<PostWithTags>, RequestError> {
    let mut tx = pool.begin().await?;
    if !user_exists(&mut tx, author_id).await? {
        return Err(RequestError::NotFound("User not found"));
    }
    let posts = sqlx::query_as::<Sqlite, Post>(&format!(
        "{POST_QUERY} WHERE author_id = $1 ORDER BY id"
    ))
    .bind(author_id)
    .fetch_all(&mut tx)
    .await?;

    let result = attach_tags(&mut tx, posts).await?;
    tx.commit().await?;
    Ok(result)
}

pub async fn get_post_in_db(pool: &SqlitePool, id: i64) -> Result<PostWithTags, RequestError> {
    let mut tx = pool.begin().await?;
    let post = find_post_with_tags(&mut tx, id).await?;
    tx.commit().await?;
    post.ok_or(RequestError::NotFound("Post not found"))
}

pub async fn update_post_in_db(
    pool: &SqlitePool,
    id: i64,
    UpdatePostRequest {
        title,
        content,
        tag_ids,
    }: UpdatePostRequest,
) -> Result<PostWithTags, RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result: Result<_, RequestError> = async {
        if !post_exists(&mut tx, id).await? {
            return Err(RequestError::NotFound("Post not found"));
        }
        let tag_ids = match tag_ids {
            Some(tag_ids) => Some(ensure_tags_exist(&mut tx, &tag_ids).await?),
            None => None,
        };

        QueryBuilder::new("posts")
            .add_param("title", title)
            .add_param("content", content)
            .execute(&mut tx, id)
            .await?;
        if let Some(tag_ids) = tag_ids {
            replace_post_tags(&mut tx, id, &tag_ids).await?;
        }
        Ok(reload_post(&mut tx, id).await?)
    }
    .await;
    let post = tx.finish(result).await?;

    tracing::debug!("Updated post {}", id);
    Ok(post)
}

/// Removes the post together with its comments and tag links. Tags stay.
pub async fn delete_post_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result = sqlx::query(
        r#"
        DELETE FROM posts WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(RequestError::from)
    .and_then(|done| match done.rows_affected() {
        0 => Err(RequestError::NotFound("Post not found")),
        _ => Ok(()),
    });
    tx.finish(result).await?;

    tracing::debug!("Deleted post {}", id);
    Ok(())
}

/// Links an existing tag to a post. Linking twice is a no-op.
pub async fn attach_tag_to_post_in_db(
    pool: &SqlitePool,
    post_id: i64,
    tag_id: i64,
) -> Result<PostWithTags, RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result: Result<_, RequestError> = async {
        if !post_exists(&mut tx, post_id).await? {
            return Err(RequestError::NotFound("Post not found"));
        }
        if find_tag(&mut tx, tag_id).await?.is_none() {
            return Err(RequestError::NotFound("Tag not found"));
        }

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO post_tags (post_id, tag_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(post_id)
        .bind(tag_id)
        .execute(&mut *tx)
        .await?;
        Ok(reload_post(&mut tx, post_id).await?)
    }
    .await;
    tx.finish(result).await
}
