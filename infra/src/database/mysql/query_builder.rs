//! Translation of [`TokenQuery`] into parameterised MySQL

use sqlx::{MySql, QueryBuilder};
use tb_core::TokenQuery;

/// Columns selected for a full token row, in `row_to_token` order
pub const TOKEN_COLUMNS: &str = "id, token, expired_at, usage_count, max_usage_limit, data, `type`, \
                                 tokenable_type, tokenable_id, created_at, updated_at";

/// SQL form of the validity rule; binds `now` once
pub(crate) fn push_validity<'q>(builder: &mut QueryBuilder<'q, MySql>, now: chrono::DateTime<chrono::Utc>) {
    builder
        .push("(max_usage_limit = 0 OR usage_count < max_usage_limit)")
        .push(" AND (expired_at IS NULL OR expired_at > ")
        .push_bind(now)
        .push(")");
}

/// Append ` WHERE ...` for every clause set on `query`
///
/// Clauses are AND-combined; an empty query selects every row.
pub fn push_filters<'q>(builder: &mut QueryBuilder<'q, MySql>, query: &TokenQuery) {
    builder.push(" WHERE 1 = 1");

    if let Some(now) = query.valid_at {
        builder.push(" AND ");
        push_validity(builder, now);
    }
    if let Some(token) = &query.token {
        builder.push(" AND token = ").push_bind(token.clone());
    }
    if let Some(token_type) = &query.token_type {
        builder.push(" AND `type` = ").push_bind(token_type.clone());
    }
    if let Some(owner) = &query.owner {
        builder
            .push(" AND tokenable_type = ")
            .push_bind(owner.kind.as_str().to_string())
            .push(" AND tokenable_id = ")
            .push_bind(owner.id.clone());
    }
}

/// Append the stable ordering and the optional limit
pub fn push_ordering(builder: &mut QueryBuilder<'_, MySql>, query: &TokenQuery) {
    builder.push(" ORDER BY created_at, id");
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ").push_bind(limit);
    }
}

/// `SELECT` of full rows matching `query`
pub fn select_tokens<'q>(table: &str, query: &TokenQuery) -> QueryBuilder<'q, MySql> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM `{}`", TOKEN_COLUMNS, table));
    push_filters(&mut builder, query);
    push_ordering(&mut builder, query);
    builder
}

/// `SELECT COUNT(*)` of rows matching `query`, ignoring its limit
pub fn count_tokens<'q>(table: &str, query: &TokenQuery) -> QueryBuilder<'q, MySql> {
    let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM `{}`", table));
    push_filters(&mut builder, query);
    builder
}
