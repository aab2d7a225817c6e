use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Comment, Post, PostWithTags, Tag, User};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub tags: Vec<TagResponse>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub post_id: i64,
}

impl UserResponse {
    pub fn new(
        User {
            id,
            username,
            email,
            created_at,
        }: User,
    ) -> Self {
        UserResponse {
            id,
            username,
            email,
            created_at,
        }
    }
}

impl TagResponse {
    pub fn new(Tag { id, name }: Tag) -> Self {
        TagResponse { id, name }
    }
}

impl PostResponse {
    pub fn new(
        PostWithTags {
            post:
                Post {
                    id,
                    title,
                    content,
                    created_at,
                    author_id,
                },
            tags,
        }: PostWithTags,
    ) -> Self {
        PostResponse {
            id,
            title,
            content,
            created_at,
            author_id,
            tags: tags.into_iter().map(TagResponse::new).collect(),
        }
    }
}

impl CommentResponse {
    pub fn new(
        Comment {
            id,
            content,
            created_at,
            author_id,
            post_id,
        }: Comment,
    ) -> Self {
        CommentResponse {
            id,
            content,
            created_at,
            author_id,
            post_id,
        }
    }
}
