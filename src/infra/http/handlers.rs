use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::articles::{ArticleResponse, CreateArticleInput, CreatedArticle};
use crate::application::auth::{LoginResponse, RegisteredUser};
use crate::application::pagination::Page;
use crate::application::repos::ArticleQuery;
use crate::application::users::{CreateUserInput, CreatedUser, UserResponse};

use super::error::ApiError;
use super::middleware::AuthenticatedUser;
use super::models::{
    ArticleListQuery, CreateArticleRequest, CreateUserRequest, LoginRequest, RegisterRequest,
    UpdateArticleRequest, UpdateUserRequest,
};
use super::state::ApiState;

pub async fn register(
    State(state): State<ApiState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredUser>), ApiError> {
    let registered = state
        .auth
        .register(request.email, request.name, request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

pub async fn login(
    State(state): State<ApiState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(response))
}

pub async fn list_articles(
    State(state): State<ApiState>,
    Query(query): Query<ArticleListQuery>,
) -> Result<Json<Page<ArticleResponse>>, ApiError> {
    let page = state.articles.find_all(ArticleQuery::from(query)).await?;
    Ok(Json(page))
}

pub async fn get_article(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = state.articles.find_by_id(id).await?;
    Ok(Json(article))
}

pub async fn create_article(
    State(state): State<ApiState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<CreatedArticle>), ApiError> {
    let created = state
        .articles
        .create(
            CreateArticleInput {
                title: request.title,
                description: request.description,
            },
            user.id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_article(
    State(state): State<ApiState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateArticleRequest>,
) -> Result<StatusCode, ApiError> {
    state.articles.update(id, request.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_article(
    State(state): State<ApiState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.articles.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_users(
    State(state): State<ApiState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.users.list_all().await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.find_by_id(id).await?;
    Ok(Json(user))
}

pub async fn create_user(
    State(state): State<ApiState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreatedUser>), ApiError> {
    let created = state
        .users
        .create(CreateUserInput {
            email: request.email,
            name: request.name,
            password: request.password,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_user(
    State(state): State<ApiState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<StatusCode, ApiError> {
    state.users.update(id, request.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_user(
    State(state): State<ApiState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn health(State(state): State<ApiState>) -> Response {
    match state.db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
