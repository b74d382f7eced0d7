//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

/// A registered author account.
///
/// `password_hash` is the opaque bcrypt credential. It never leaves the
/// application layer: response projections and cache payloads strip it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

/// An article with its author eagerly resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub published_at: OffsetDateTime,
    pub author: UserRecord,
}
