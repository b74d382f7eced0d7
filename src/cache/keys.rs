//! Cache key construction.
//!
//! Single-entity keys derive only from the entity identifier, never from
//! query parameters: identifiers are stable, filters are not. Collection
//! keys derive from the full query descriptor in a canonical, field-ordered
//! rendering with defaults applied, so requests differing only in
//! explicit-vs-default spellings collide on the same key.

use crate::application::repos::ArticleQuery;

/// Entity kinds the cache layer distinguishes.
///
/// Invalidation is scoped per kind: mutating an article never touches user
/// keys and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Article,
    User,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::User => "user",
        }
    }
}

/// Queries that can key a cached collection.
///
/// `canonical` must be a total, deterministic function of the descriptor's
/// field values. The field order is fixed by the implementation, never by
/// whoever constructed the descriptor.
pub trait CollectionQuery {
    fn canonical(&self) -> String;
}

impl CollectionQuery for ArticleQuery {
    fn canonical(&self) -> String {
        // Timestamp bounds render as unix seconds: total and deterministic,
        // unlike a formatted date that can fail for out-of-range years.
        format!(
            "page={}&limit={}&published_after={}&published_before={}&author_id={}",
            self.page(),
            self.limit(),
            opt(self.published_after.map(|t| t.unix_timestamp())),
            opt(self.published_before.map(|t| t.unix_timestamp())),
            opt(self.author_id),
        )
    }
}

fn opt(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Key for a single cached entity: `article:42`.
pub fn entity_key(kind: EntityKind, id: i64) -> String {
    format!("{}:{}", kind.as_str(), id)
}

/// Key for a cached collection page: `articles:page=1&limit=10&...`.
pub fn collection_key<Q: CollectionQuery>(kind: EntityKind, query: &Q) -> String {
    format!("{}s:{}", kind.as_str(), query.canonical())
}

/// Namespace prefix scoping invalidation sweeps: `articles:`.
pub fn collection_prefix(kind: EntityKind) -> String {
    format!("{}s:", kind.as_str())
}
