//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::{DEFAULT_LIMIT, DEFAULT_PAGE, Page};
use crate::domain::entities::{ArticleRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Closed descriptor for paginated article queries.
///
/// Every field that can influence the result set lives here, which makes the
/// descriptor the single source of cache-key identity. Accessors apply the
/// documented defaults so an explicit `page=1` and an absent page are the
/// same query.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArticleQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub published_after: Option<OffsetDateTime>,
    pub published_before: Option<OffsetDateTime>,
    pub author_id: Option<i64>,
}

impl ArticleQuery {
    pub fn page(&self) -> u32 {
        self.page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> u32 {
        self.limit.filter(|l| *l >= 1).unwrap_or(DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }
}

#[derive(Debug, Clone)]
pub struct CreateArticleParams {
    pub title: String,
    pub description: String,
    pub author_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateArticleParams {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserParams {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError>;

    async fn find_by_title(&self, title: &str) -> Result<Option<ArticleRecord>, RepoError>;

    /// Filters combine conjunctively; results order by `published_at DESC`.
    async fn find_paginated(&self, query: &ArticleQuery)
    -> Result<Page<ArticleRecord>, RepoError>;

    async fn create(&self, params: CreateArticleParams) -> Result<ArticleRecord, RepoError>;

    async fn update(&self, id: i64, params: UpdateArticleParams) -> Result<(), RepoError>;

    async fn delete(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn list_all(&self) -> Result<Vec<UserRecord>, RepoError>;

    async fn create(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn update(&self, id: i64, params: UpdateUserParams) -> Result<(), RepoError>;

    async fn delete(&self, id: i64) -> Result<(), RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_apply() {
        let query = ArticleQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 10);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn zero_page_and_limit_fall_back_to_defaults() {
        let query = ArticleQuery {
            page: Some(0),
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 10);
    }

    #[test]
    fn offset_is_page_minus_one_times_limit() {
        let query = ArticleQuery {
            page: Some(3),
            limit: Some(25),
            ..Default::default()
        };
        assert_eq!(query.offset(), 50);
    }
}
