//! MySQL-backed repositories

pub mod query_builder;
mod token_repository_impl;

pub use token_repository_impl::MySqlTokenRepository;

/// DDL for a token table named `table`
///
/// `table` must already be a validated identifier. Times are `DATETIME(6)`
/// holding UTC values, so expirations past 2038 are stored as given.
pub fn create_table_sql(table: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS `{table}` (
    id CHAR(36) NOT NULL PRIMARY KEY,
    token VARCHAR(255) NOT NULL,
    expired_at DATETIME(6) NULL,
    usage_count INT UNSIGNED NOT NULL DEFAULT 0,
    max_usage_limit INT UNSIGNED NOT NULL DEFAULT 0,
    data JSON NULL,
    `type` VARCHAR(64) NOT NULL,
    tokenable_type VARCHAR(64) NULL,
    tokenable_id VARCHAR(64) NULL,
    created_at DATETIME(6) NOT NULL DEFAULT CURRENT_DATETIME(6),
    updated_at DATETIME(6) NOT NULL DEFAULT CURRENT_DATETIME(6),
    INDEX idx_{table}_token (token, `type`),
    INDEX idx_{table}_tokenable (tokenable_type, tokenable_id),
    INDEX idx_{table}_expired_at (expired_at)
)"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_sql_uses_table_name() {
        let sql = create_table_sql("invite_codes");
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `invite_codes`"));
        assert!(sql.contains("usage_count INT UNSIGNED NOT NULL DEFAULT 0"));
        assert!(sql.contains("INDEX idx_invite_codes_token (token, `type`)"));
        assert!(sql.contains("expired_at DATETIME(6) NULL"));
        assert!(!sql.contains("TIMESTAMP("));
    }
}
