//! Request payloads and query-string shapes for the JSON API.

use serde::Deserialize;
use time::OffsetDateTime;

use crate::application::repos::{ArticleQuery, UpdateArticleParams, UpdateUserParams};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateArticleRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl From<UpdateArticleRequest> for UpdateArticleParams {
    fn from(request: UpdateArticleRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl From<UpdateUserRequest> for UpdateUserParams {
    fn from(request: UpdateUserRequest) -> Self {
        Self {
            email: request.email,
            name: request.name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticleListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_after: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_before: Option<OffsetDateTime>,
    pub author_id: Option<i64>,
}

impl From<ArticleListQuery> for ArticleQuery {
    fn from(query: ArticleListQuery) -> Self {
        Self {
            page: query.page,
            limit: query.limit,
            published_after: query.published_after,
            published_before: query.published_before,
            author_id: query.author_id,
        }
    }
}
