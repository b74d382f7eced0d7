//! Application services layer.

pub mod articles;
pub mod auth;
pub mod error;
pub mod pagination;
pub mod repos;
pub mod users;
