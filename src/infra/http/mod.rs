pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use std::future::Future;
use std::time::Duration;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tokio::sync::watch;
use tracing::warn;

use middleware::{log_responses, set_request_context};

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route(
            "/articles",
            get(handlers::list_articles).post(handlers::create_article),
        )
        .route(
            "/articles/{id}",
            get(handlers::get_article)
                .put(handlers::update_article)
                .delete(handlers::delete_article),
        )
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

/// Drive the server future to completion, bounding connection drain once
/// shutdown has been signalled. A drain that outlives the deadline is
/// abandoned and its in-flight connections are dropped with the process.
pub async fn await_with_drain_deadline<F, E>(
    server: F,
    mut shutdown: watch::Receiver<bool>,
    deadline: Duration,
) -> Result<(), E>
where
    F: Future<Output = Result<(), E>>,
{
    tokio::pin!(server);
    tokio::select! {
        result = &mut server => result,
        _ = async {
            if shutdown.changed().await.is_ok() {
                tokio::time::sleep(deadline).await;
            } else {
                // The signal sender is gone; let the server run on.
                std::future::pending::<()>().await;
            }
        } => {
            warn!(
                deadline_secs = deadline.as_secs(),
                "drain deadline exceeded, abandoning in-flight connections",
            );
            Ok(())
        }
    }
}
