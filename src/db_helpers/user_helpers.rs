use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::{
    data_formats::{CreateUserRequest, UpdateUserRequest},
    errors::RequestError,
    models::User,
};

use super::{substring_pattern, QueryBuilder, WriteTransaction};

const USER_QUERY: &str = r#"
        SELECT id, username, email, created_at FROM users
"#;

async fn find_user(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<Sqlite, User>(&format!("{USER_QUERY} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Fails with `Conflict` when another user (any user when `exclude_id` is
/// `None`) already holds the username or email.
async fn ensure_user_unique(
    conn: &mut SqliteConnection,
    username: Option<&str>,
    email: Option<&str>,
    exclude_id: Option<i64>,
) -> Result<(), RequestError> {
    if let Some(username) = username {
        let taken = sqlx::query_scalar::<Sqlite, i64>(
            "SELECT id FROM users WHERE username = $1 AND ($2 IS NULL OR id != $2)",
        )
        .bind(username)
        .bind(exclude_id)
        .fetch_optional(&mut *conn)
        .await?;
        if taken.is_some() {
            return Err(RequestError::Conflict("Username already exists"));
        }
    }
    if let Some(email) = email {
        let taken = sqlx::query_scalar::<Sqlite, i64>(
            "SELECT id FROM users WHERE email = $1 AND ($2 IS NULL OR id != $2)",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_optional(&mut *conn)
        .await?;
        if taken.is_some() {
            return Err(RequestError::Conflict("Email already exists"));
        }
    }
    Ok(())
}

/// A concurrent writer can slip past the pre-check; the UNIQUE index catches it.
fn unique_user_violation(error: sqlx::Error) -> RequestError {
    let message = if error.to_string().contains("users.email") {
        "Email already exists"
    } else {
        "Username already exists"
    };
    RequestError::from(error).on_unique_violation(message)
}

// ----------------- User Queries -----------------

pub async fn insert_user_in_db(
    pool: &SqlitePool,
    CreateUserRequest { username, email }: CreateUserRequest,
) -> Result<User, RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result: Result<_, RequestError> = async {
        ensure_user_unique(&mut tx, Some(username.as_str()), Some(email.as_str()), None).await?;
        sqlx::query_as::<Sqlite, User>(
            r#"
            INSERT INTO users (username, email, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_user_violation)
    }
    .await;
    let user = tx.finish(result).await?;

    tracing::debug!("Created user {} ({})", user.id, user.username);
    Ok(user)
}

pub async fn list_users_in_db(
    pool: &SqlitePool,
    query: Option<String>,
) -> Result<Vec<User>, RequestError> {
    let mut tx = pool.begin().await?;
    let pattern = query.as_deref().map(substring_pattern);
    let result = sqlx::query_as::<Sqlite, User>(&format!(
        r#"{USER_QUERY}
        WHERE ($1 IS NULL OR username LIKE $1 ESCAPE '\')
        ORDER BY id
        "#
    ))
    .bind(pattern)
    .fetch_all(&mut tx)
    .await?;
    tx.commit().await?;
    Ok(result)
}

pub async fn get_user_in_db(pool: &SqlitePool, id: i64) -> Result<User, RequestError> {
    let mut tx = pool.begin().await?;
    let user = find_user(&mut tx, id).await?;
    tx.commit().await?;
    user.ok_or(RequestError::NotFound("User not found"))
}

pub async fn update_user_in_db(
    pool: &SqlitePool,
    id: i64,
    UpdateUserRequest { username, email }: UpdateUserRequest,
) -> Result<User, RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result: Result<_, RequestError> = async {
        if find_user(&mut tx, id).await?.is_none() {
            return Err(RequestError::NotFound("User not found"));
        }
        ensure_user_unique(&mut tx, username.as_deref(), email.as_deref(), Some(id)).await?;

        QueryBuilder::new("users")
            .add_param("username", username)
            .add_param("email", email)
            .execute(&mut tx, id)
            .await
            .map_err(unique_user_violation)?;

        let user = sqlx::query_as::<Sqlite, User>(&format!("{USER_QUERY} WHERE id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        Ok(user)
    }
    .await;
    let user = tx.finish(result).await?;

    tracing::debug!("Updated user {}", id);
    Ok(user)
}

/// Removes the user; posts, comments and their tag links go with it through
/// `ON DELETE CASCADE`.
pub async fn delete_user_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let mut tx = WriteTransaction::begin(pool).await?;
    let result = sqlx::query(
        r#"
        DELETE FROM users WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(RequestError::from)
    .and_then(|done| match done.rows_affected() {
        0 => Err(RequestError::NotFound("User not found")),
        _ => Ok(()),
    });
    tx.finish(result).await?;

    tracing::debug!("Deleted user {}", id);
    Ok(())
}
