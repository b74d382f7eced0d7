//! Article service: cache-aside reads and invalidating writes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::application::error::AppError;
use crate::application::pagination::Page;
use crate::application::repos::{
    ArticleQuery, ArticlesRepo, CreateArticleParams, RepoError, UpdateArticleParams, UsersRepo,
};
use crate::cache::{
    CacheClient, CacheConfig, EntityKind, FetchError, Invalidator, fetch_collection, fetch_entity,
};
use crate::domain::entities::{ArticleRecord, UserRecord};

/// Author sub-object embedded in article responses. Limited to the public
/// fields; the password credential is never serialized into a response or a
/// cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserRecord> for AuthorSummary {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

/// Response-shaped article projection. This, not the raw record, is what
/// gets serialized into cache entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub author: AuthorSummary,
}

impl From<ArticleRecord> for ArticleResponse {
    fn from(record: ArticleRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            published_at: record.published_at,
            author: AuthorSummary::from(record.author),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateArticleInput {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CreatedArticle {
    pub id: i64,
}

pub struct ArticleService {
    articles: Arc<dyn ArticlesRepo>,
    users: Arc<dyn UsersRepo>,
    cache: Arc<dyn CacheClient>,
    invalidator: Invalidator,
    config: CacheConfig,
}

impl ArticleService {
    pub fn new(
        articles: Arc<dyn ArticlesRepo>,
        users: Arc<dyn UsersRepo>,
        cache: Arc<dyn CacheClient>,
        config: CacheConfig,
    ) -> Self {
        Self {
            articles,
            users,
            invalidator: Invalidator::new(cache.clone()),
            cache,
            config,
        }
    }

    /// Create an article authored by `author_id`.
    ///
    /// The title uniqueness pre-check accepts a race window between check
    /// and insert; the store's unique constraint is the fallback that closes
    /// it.
    pub async fn create(
        &self,
        input: CreateArticleInput,
        author_id: i64,
    ) -> Result<CreatedArticle, AppError> {
        if input.title.trim().is_empty() {
            return Err(AppError::validation("title must not be empty"));
        }

        let author = self
            .users
            .find_by_id(author_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User with id {author_id} not found")))?;

        if self.articles.find_by_title(&input.title).await?.is_some() {
            return Err(AppError::conflict("Article with this title already exists"));
        }

        let record = self
            .articles
            .create(CreateArticleParams {
                title: input.title,
                description: input.description,
                author_id: author.id,
            })
            .await?;

        if self.config.enabled {
            self.invalidator.on_created(EntityKind::Article).await;
        }

        Ok(CreatedArticle { id: record.id })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<ArticleResponse, AppError> {
        if !self.config.enabled {
            return self
                .load_by_id(id)
                .await?
                .ok_or_else(|| article_not_found(id));
        }

        fetch_entity(
            self.cache.as_ref(),
            self.config.ttl_seconds,
            EntityKind::Article,
            id,
            || self.load_by_id(id),
        )
        .await
        .map_err(|err| match err {
            FetchError::NotFound => article_not_found(id),
            FetchError::Store(store) => store.into(),
        })
    }

    pub async fn find_all(&self, query: ArticleQuery) -> Result<Page<ArticleResponse>, AppError> {
        if !self.config.enabled {
            return Ok(self.load_page(&query).await?);
        }

        fetch_collection(
            self.cache.as_ref(),
            self.config.ttl_seconds,
            EntityKind::Article,
            &query,
            || self.load_page(&query),
        )
        .await
        .map_err(|err| match err {
            // Collections always resolve to a page, possibly empty.
            FetchError::NotFound => AppError::unexpected("collection load reported absence"),
            FetchError::Store(store) => store.into(),
        })
    }

    pub async fn update(&self, id: i64, params: UpdateArticleParams) -> Result<(), AppError> {
        if self.articles.find_by_id(id).await?.is_none() {
            return Err(article_not_found(id));
        }

        self.articles.update(id, params).await?;

        if self.config.enabled {
            self.invalidator.on_updated(EntityKind::Article, id).await;
        }

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if self.articles.find_by_id(id).await?.is_none() {
            return Err(article_not_found(id));
        }

        self.articles.delete(id).await?;

        if self.config.enabled {
            self.invalidator.on_deleted(EntityKind::Article, id).await;
        }

        Ok(())
    }

    async fn load_by_id(&self, id: i64) -> Result<Option<ArticleResponse>, RepoError> {
        Ok(self
            .articles
            .find_by_id(id)
            .await?
            .map(ArticleResponse::from))
    }

    async fn load_page(&self, query: &ArticleQuery) -> Result<Page<ArticleResponse>, RepoError> {
        Ok(self
            .articles
            .find_paginated(query)
            .await?
            .map(ArticleResponse::from))
    }
}

fn article_not_found(id: i64) -> AppError {
    AppError::not_found(format!("Article with id {id} not found"))
}
