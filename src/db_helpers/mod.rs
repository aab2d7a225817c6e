use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::errors::RequestError;
use crate::models::{Post, PostTag, PostWithTags, Tag};

mod comment_helpers;
mod post_helpers;
mod tag_helpers;
mod user_helpers;

pub use comment_helpers::*;
pub use post_helpers::*;
pub use tag_helpers::*;
pub use user_helpers::*;

/// SQLite caps the number of bound variables per statement.
const MAX_BINDS_PER_QUERY: usize = 500;

/// Builds an `UPDATE <table> SET ... WHERE id = ?` statement out of the fields a
/// partial update actually supplies.
struct QueryBuilder {
    query: String,
    params: Vec<String>,
    separator: &'static str,
}

impl QueryBuilder {
    fn new(table: &str) -> Self {
        Self {
            query: format!("UPDATE {table} SET "),
            params: vec![],
            separator: ", ",
        }
    }

    fn add_param(mut self, column: &str, param: Option<String>) -> Self {
        if let Some(value) = param {
            if !self.params.is_empty() {
                self.query.push_str(self.separator);
            }
            self.query.push_str(&format!("{column} = ?"));
            self.params.push(value);
        }
        self
    }

    /// Returns `None` when no column was supplied, i.e. there is nothing to write.
    fn build(self) -> Option<(String, Vec<String>)> {
        if self.params.is_empty() {
            return None;
        }
        Some((format!("{} WHERE id = ?", self.query), self.params))
    }

    async fn execute(self, conn: &mut SqliteConnection, id: i64) -> Result<(), sqlx::Error> {
        let (query, params) = match self.build() {
            Some(built) => built,
            None => return Ok(()),
        };
        let mut query = sqlx::query(&query);
        for param in params {
            query = query.bind(param);
        }
        query.bind(id).execute(&mut *conn).await?;
        Ok(())
    }
}

/// A transaction opened with `BEGIN IMMEDIATE`: the writer lock is taken up front,
/// waiting out the busy timeout, so the reads that precede a write never have to
/// upgrade a stale snapshot.
///
/// Dropping it without [`WriteTransaction::finish`] leaves the transaction open on
/// the pooled connection; the pool's release hook rolls it back.
pub(crate) struct WriteTransaction {
    conn: PoolConnection<Sqlite>,
}

impl WriteTransaction {
    pub(crate) async fn begin(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn })
    }

    /// Commits when `result` is `Ok`, rolls back otherwise, then hands it back.
    pub(crate) async fn finish<T>(
        mut self,
        result: Result<T, RequestError>,
    ) -> Result<T, RequestError> {
        let statement = if result.is_ok() { "COMMIT" } else { "ROLLBACK" };
        sqlx::query(statement).execute(&mut *self.conn).await?;
        result
    }
}

impl Deref for WriteTransaction {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        &self.conn
    }
}

impl DerefMut for WriteTransaction {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

/// Release hook for the pool: closes out a write transaction whose owner went away
/// before finishing it. On a clean connection the `ROLLBACK` is a harmless error.
pub(crate) async fn rollback_abandoned(conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    if let Err(error) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
        tracing::trace!("No transaction left open on release: {}", error);
    }
    Ok(true)
}

// ----------------- Helper Functions -----------------

async fn row_exists(
    conn: &mut SqliteConnection,
    query: &str,
    id: i64,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query_scalar::<Sqlite, i64>(query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

pub(crate) async fn user_exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    row_exists(conn, "SELECT id FROM users WHERE id = $1", id).await
}

pub(crate) async fn post_exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    row_exists(conn, "SELECT id FROM posts WHERE id = $1", id).await
}

pub(crate) async fn tag_exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    row_exists(conn, "SELECT id FROM tags WHERE id = $1", id).await
}

/// Pairs a single post with its tags, ordered by id.
pub(crate) async fn load_tags(
    conn: &mut SqliteConnection,
    post: Post,
) -> Result<PostWithTags, sqlx::Error> {
    let tags = sqlx::query_as::<Sqlite, Tag>(
        r#"
        SELECT tags.id, tags.name
        FROM tags
            JOIN post_tags ON post_tags.tag_id = tags.id
        WHERE post_tags.post_id = $1
        ORDER BY tags.id
        "#,
    )
    .bind(post.id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(PostWithTags { post, tags })
}

/// Loads the tag set of every post in one query per chunk of ids and pairs it
/// with its post. Tags come back ordered by id.
pub(crate) async fn attach_tags(
    conn: &mut SqliteConnection,
    posts: Vec<Post>,
) -> Result<Vec<PostWithTags>, sqlx::Error> {
    let mut tags_by_post: HashMap<i64, Vec<Tag>> = HashMap::new();

    let ids: Vec<i64> = posts.iter().map(|post| post.id).collect();
    for chunk in ids.chunks(MAX_BINDS_PER_QUERY) {
        let mut builder = sqlx::QueryBuilder::<Sqlite>::new(
            r#"
            SELECT post_tags.post_id AS post_id, tags.id AS tag_id, tags.name AS name
            FROM post_tags
                JOIN tags ON tags.id = post_tags.tag_id
            WHERE post_tags.post_id IN ("#,
        );
        let mut separated = builder.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY tags.id");

        let rows = builder
            .build_query_as::<PostTag>()
            .fetch_all(&mut *conn)
            .await?;
        for PostTag {
            post_id,
            tag_id,
            name,
        } in rows
        {
            tags_by_post
                .entry(post_id)
                .or_default()
                .push(Tag { id: tag_id, name });
        }
    }

    Ok(posts
        .into_iter()
        .map(|post| {
            let tags = tags_by_post.remove(&post.id).unwrap_or_default();
            PostWithTags { post, tags }
        })
        .collect())
}

/// Turns user input into a `LIKE` pattern matching it as a literal substring.
/// Use together with `ESCAPE '\'`.
fn substring_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_builder_only_sets_supplied_columns() {
        let (query, params) = QueryBuilder::new("posts")
            .add_param("title", Some("New".to_owned()))
            .add_param("content", None)
            .build()
            .unwrap();
        assert_eq!(query, "UPDATE posts SET title = ? WHERE id = ?");
        assert_eq!(params, vec!["New".to_owned()]);

        let (query, params) = QueryBuilder::new("users")
            .add_param("username", Some("ada".to_owned()))
            .add_param("email", Some("ada@x.com".to_owned()))
            .build()
            .unwrap();
        assert_eq!(query, "UPDATE users SET username = ?, email = ? WHERE id = ?");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn update_builder_without_columns_builds_nothing() {
        assert!(QueryBuilder::new("tags")
            .add_param("name", None)
            .build()
            .is_none());
    }

    #[tokio::test]
    async fn abandoned_write_transaction_is_rolled_back_on_release() {
        let (pool, _dir) = test_support::test_pool().await;
        {
            let mut tx = WriteTransaction::begin(&pool).await.unwrap();
            sqlx::query("INSERT INTO tags (name) VALUES ('lost')")
                .execute(&mut *tx)
                .await
                .unwrap();
        }

        let mut tx = WriteTransaction::begin(&pool).await.unwrap();
        let kept = sqlx::query("INSERT INTO tags (name) VALUES ('kept')")
            .execute(&mut *tx)
            .await
            .map(|_| ())
            .map_err(RequestError::from);
        tx.finish(kept).await.unwrap();

        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM tags ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(names, vec!["kept".to_owned()]);
    }

    #[tokio::test]
    async fn failed_result_rolls_back_the_write() {
        let (pool, _dir) = test_support::test_pool().await;
        let mut tx = WriteTransaction::begin(&pool).await.unwrap();
        sqlx::query("INSERT INTO tags (name) VALUES ('draft')")
            .execute(&mut *tx)
            .await
            .unwrap();
        let error = tx
            .finish::<()>(Err(RequestError::Conflict("Tag already exists")))
            .await
            .unwrap_err();
        assert!(matches!(error, RequestError::Conflict(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn substring_pattern_escapes_wildcards() {
        assert_eq!(substring_pattern("ad"), "%ad%");
        assert_eq!(substring_pattern("a_b%"), r"%a\_b\%%");
        assert_eq!(substring_pattern(r"x\y"), r"%x\\y%");
    }
}
