use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::{
    data_formats::{CreateTagRequest, UpdateTagRequest},
    errors::RequestError,
    models::Tag,
};

use super::{QueryBuilder, WriteTransaction};

pub(crate) async fn find_tag(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Tag>, sqlx::Error> {
    sqlx::query_as::<Sqlite, Tag>("SELECT id, name FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

async fn ensure_tag_name_free(
    conn: &mut SqliteConnection,
    name: &str,
    exclude_id: Option<i64>,
) -> Result<(), RequestError> {
    let taken = sqlx::query_scalar::<Sqlite, i64>(
        "SELECT id FROM tags WHERE name = $1 AND ($2 IS NULL OR id != $2)",
    )
    .bind(name)
    .bind(exclude_id)
    .fetch_optional(&mut *conn)
    .await?;
    match taken {
        Some(_) => Err(RequestError::Conflict("Tag already exists")),
        None => Ok(()),
    }
}

pub async fn insert_tag_in_db(
    pool: &SqlitePool,
    CreateTagRequest { name }: CreateTagRequest,
) -> Result<Tag, RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result: Result<_, RequestError> = async {
        ensure_tag_name_free(&mut tx, &name, None).await?;
        sqlx::query_as::<Sqlite, Tag>(
            r#"
            INSERT INTO tags (name)
            VALUES ($1)
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RequestError::from(e).on_unique_violation("Tag already exists"))
    }
    .await;
    let tag = tx.finish(result).await?;

    tracing::debug!("Created tag {} ({})", tag.id, tag.name);
    Ok(tag)
}

pub async fn list_tags_in_db(pool: &SqlitePool) -> Result<Vec<Tag>, RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query_as::<Sqlite, Tag>(
        r#"
        SELECT id, name FROM tags ORDER BY id
        "#,
    )
    .fetch_all(&mut tx)
    .await?;

    tx.commit().await?;
    Ok(result)
}

pub async fn get_tag_in_db(pool: &SqlitePool, id: i64) -> Result<Tag, RequestError> {
    let mut tx = pool.begin().await?;
    let tag = find_tag(&mut tx, id).await?;
    tx.commit().await?;
    tag.ok_or(RequestError::NotFound("Tag not found"))
}

pub async fn update_tag_in_db(
    pool: &SqlitePool,
    id: i64,
    UpdateTagRequest { name }: UpdateTagRequest,
) -> Result<Tag, RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result: Result<_, RequestError> = async {
        if find_tag(&mut tx, id).await?.is_none() {
            return Err(RequestError::NotFound("Tag not found"));
        }
        if let Some(name) = &name {
            ensure_tag_name_free(&mut tx, name, Some(id)).await?;
        }

        QueryBuilder::new("tags")
            .add_param("name", name)
            .execute(&mut tx, id)
            .await
            .map_err(|e| RequestError::from(e).on_unique_violation("Tag already exists"))?;

        let tag = sqlx::query_as::<Sqlite, Tag>("SELECT id, name FROM tags WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        Ok(tag)
    }
    .await;
    tx.finish(result).await
}

/// Deleting a tag detaches it from every post; the posts themselves stay.
pub async fn delete_tag_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(RequestError::from)
        .and_then(|done| match done.rows_affected() {
            0 => Err(RequestError::NotFound("Tag not found")),
            _ => Ok(()),
        });
    tx.finish(result).await?;

    tracing::debug!("Deleted tag {}", id);
    Ok(())
}
