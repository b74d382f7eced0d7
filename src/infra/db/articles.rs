use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::pagination::Page;
use crate::application::repos::{
    ArticleQuery, ArticlesRepo, CreateArticleParams, RepoError, UpdateArticleParams,
};
use crate::domain::entities::{ArticleRecord, UserRecord};

use super::{PostgresRepositories, map_sqlx_error};

const SELECT_ARTICLE: &str = "SELECT a.id, a.title, a.description, a.published_at, \
     u.id AS author_id, u.email AS author_email, u.name AS author_name, \
     u.password_hash AS author_password_hash, u.created_at AS author_created_at \
     FROM articles a \
     INNER JOIN users u ON u.id = a.author_id";

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    description: String,
    published_at: OffsetDateTime,
    author_id: i64,
    author_email: String,
    author_name: String,
    author_password_hash: String,
    author_created_at: OffsetDateTime,
}

impl From<ArticleRow> for ArticleRecord {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            published_at: row.published_at,
            author: UserRecord {
                id: row.author_id,
                email: row.author_email,
                name: row.author_name,
                password_hash: row.author_password_hash,
                created_at: row.author_created_at,
            },
        }
    }
}

/// Offset as a bind parameter. Extreme page/limit combinations overflow the
/// store's signed range and would otherwise wrap into a negative OFFSET.
fn offset_param(query: &ArticleQuery) -> Result<i64, RepoError> {
    i64::try_from(query.offset()).map_err(|_| RepoError::InvalidInput {
        message: format!(
            "page {} with limit {} is beyond the supported offset range",
            query.page(),
            query.limit()
        ),
    })
}

fn apply_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ArticleQuery) {
    if let Some(after) = query.published_after {
        qb.push(" AND a.published_at >= ");
        qb.push_bind(after);
    }
    if let Some(before) = query.published_before {
        qb.push(" AND a.published_at <= ");
        qb.push_bind(before);
    }
    if let Some(author_id) = query.author_id {
        qb.push(" AND a.author_id = ");
        qb.push_bind(author_id);
    }
}

#[async_trait]
impl ArticlesRepo for PostgresRepositories {
    async fn find_by_id(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        let sql = format!("{SELECT_ARTICLE} WHERE a.id = $1");
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ArticleRecord::from))
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<ArticleRecord>, RepoError> {
        let sql = format!("{SELECT_ARTICLE} WHERE a.title = $1");
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(title)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ArticleRecord::from))
    }

    async fn find_paginated(
        &self,
        query: &ArticleQuery,
    ) -> Result<Page<ArticleRecord>, RepoError> {
        let offset = offset_param(query)?;

        let mut qb = QueryBuilder::new(SELECT_ARTICLE);
        qb.push(" WHERE TRUE");
        apply_filters(&mut qb, query);
        qb.push(" ORDER BY a.published_at DESC LIMIT ");
        qb.push_bind(i64::from(query.limit()));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<ArticleRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM articles a WHERE TRUE");
        apply_filters(&mut count_qb, query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Page::new(
            rows.into_iter().map(ArticleRecord::from).collect(),
            Self::convert_count(total)?,
            query.page(),
            query.limit(),
        ))
    }

    async fn create(&self, params: CreateArticleParams) -> Result<ArticleRecord, RepoError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO articles (title, description, author_id) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&params.title)
        .bind(&params.description)
        .bind(params.author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::from_persistence("created article row missing"))
    }

    async fn update(&self, id: i64, params: UpdateArticleParams) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE articles \
             SET title = COALESCE($1, title), description = COALESCE($2, description) \
             WHERE id = $3",
        )
        .bind(params.title)
        .bind(params.description)
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_stays_within_bind_range() {
        let query = ArticleQuery {
            page: Some(3),
            limit: Some(25),
            ..Default::default()
        };
        assert_eq!(offset_param(&query).expect("fits"), 50);
    }

    #[test]
    fn extreme_pagination_is_invalid_input_not_a_wrap() {
        let query = ArticleQuery {
            page: Some(u32::MAX),
            limit: Some(u32::MAX),
            ..Default::default()
        };
        assert!(matches!(
            offset_param(&query),
            Err(RepoError::InvalidInput { .. })
        ));
    }
}
