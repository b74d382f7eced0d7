use std::sync::Arc;

use crate::application::articles::ArticleService;
use crate::application::auth::AuthService;
use crate::application::users::UserService;
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct ApiState {
    pub articles: Arc<ArticleService>,
    pub users: Arc<UserService>,
    pub auth: Arc<AuthService>,
    pub db: PostgresRepositories,
}
