//! MySQL implementation of the TokenRepository trait.
//!
//! Every counter change is a single `UPDATE` evaluated by the server, so
//! concurrent uses from any number of processes are never lost.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use futures::StreamExt;
use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::types::Json;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};
use uuid::Uuid;

use tb_core::domain::entities::token::{NewToken, Token};
use tb_core::errors::DomainError;
use tb_core::repositories::{TokenRepository, TokenStream};
use tb_core::{OwnerRef, TokenQuery};
use tb_shared::validation::validators;

use super::query_builder::{self, TOKEN_COLUMNS};

/// MySQL implementation of TokenRepository
#[derive(Clone)]
pub struct MySqlTokenRepository {
    /// Database connection pool
    pool: MySqlPool,
    /// Table holding the token rows
    table: String,
}

impl MySqlTokenRepository {
    /// Create a repository over the default `tokens` table
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            table: String::from("tokens"),
        }
    }

    /// Create a repository over a custom table
    ///
    /// # Returns
    /// * `Err(DomainError::Validation)` - The name is not a plain SQL identifier
    pub fn with_table(pool: MySqlPool, table: &str) -> Result<Self, DomainError> {
        if !validators::is_sql_identifier(table) {
            return Err(DomainError::Validation {
                message: format!("Invalid token table name: {}", table),
            });
        }
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the token table if it does not exist yet
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        sqlx::query(&super::create_table_sql(&self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::store_write(format!("Failed to create token table: {}", e)))?;
        Ok(())
    }

    /// Convert database row to Token entity
    fn row_to_token(row: &MySqlRow) -> Result<Token, DomainError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| DomainError::store_read(format!("Failed to get id: {}", e)))?;
        let data: Option<Json<Value>> = row
            .try_get("data")
            .map_err(|e| DomainError::store_read(format!("Failed to get data: {}", e)))?;
        let tokenable_type: Option<String> = row
            .try_get("tokenable_type")
            .map_err(|e| DomainError::store_read(format!("Failed to get tokenable_type: {}", e)))?;
        let tokenable_id: Option<String> = row
            .try_get("tokenable_id")
            .map_err(|e| DomainError::store_read(format!("Failed to get tokenable_id: {}", e)))?;

        let tokenable = match (tokenable_type, tokenable_id) {
            (Some(kind), Some(owner_id)) => Some(OwnerRef::new(kind, owner_id)),
            (None, None) => None,
            _ => {
                return Err(DomainError::InvalidState {
                    message: format!("Token {} has a partial owner reference", id),
                })
            }
        };

        Ok(Token {
            id: Uuid::parse_str(&id)
                .map_err(|e| DomainError::store_read(format!("Invalid token UUID: {}", e)))?,
            token: row
                .try_get("token")
                .map_err(|e| DomainError::store_read(format!("Failed to get token: {}", e)))?,
            expired_at: row
                .try_get::<Option<DateTime<Utc>>, _>("expired_at")
                .map_err(|e| DomainError::store_read(format!("Failed to get expired_at: {}", e)))?,
            usage_count: row
                .try_get("usage_count")
                .map_err(|e| DomainError::store_read(format!("Failed to get usage_count: {}", e)))?,
            max_usage_limit: row
                .try_get("max_usage_limit")
                .map_err(|e| DomainError::store_read(format!("Failed to get max_usage_limit: {}", e)))?,
            data: data.map_or(Value::Null, |Json(value)| value),
            token_type: row
                .try_get("type")
                .map_err(|e| DomainError::store_read(format!("Failed to get type: {}", e)))?,
            tokenable,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(|e| DomainError::store_read(format!("Failed to get created_at: {}", e)))?,
            updated_at: row
                .try_get::<DateTime<Utc>, _>("updated_at")
                .map_err(|e| DomainError::store_read(format!("Failed to get updated_at: {}", e)))?,
        })
    }

    /// `NULL` for an absent payload
    fn encode_data(data: &Value) -> Option<Json<Value>> {
        (!data.is_null()).then(|| Json(data.clone()))
    }

    /// MySQL keeps microseconds; truncating up front keeps returned
    /// entities equal to what a later read produces
    fn timestamp() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    async fn stored_usage_count(&self, id: Uuid) -> Result<Option<u32>, DomainError> {
        let query = format!("SELECT usage_count FROM `{}` WHERE id = ?", self.table);
        sqlx::query_scalar::<_, u32>(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::store_read(format!("Failed to check token existence: {}", e)))
    }
}

#[async_trait]
impl TokenRepository for MySqlTokenRepository {
    async fn create(&self, new_token: NewToken) -> Result<Token, DomainError> {
        let now = Self::timestamp();
        let token = Token {
            id: Uuid::new_v4(),
            token: new_token.token,
            expired_at: new_token.expired_at.map(|at| at.trunc_subsecs(6)),
            usage_count: 0,
            max_usage_limit: new_token.max_usage_limit,
            data: new_token.data,
            token_type: new_token.token_type,
            tokenable: new_token.tokenable,
            created_at: now,
            updated_at: now,
        };

        let query = format!(
            "INSERT INTO `{}` ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.table, TOKEN_COLUMNS
        );
        sqlx::query(&query)
            .bind(token.id.to_string())
            .bind(&token.token)
            .bind(token.expired_at)
            .bind(token.usage_count)
            .bind(token.max_usage_limit)
            .bind(Self::encode_data(&token.data))
            .bind(&token.token_type)
            .bind(token.tokenable.as_ref().map(|owner| owner.kind.as_str().to_string()))
            .bind(token.tokenable.as_ref().map(|owner| owner.id.clone()))
            .bind(token.created_at)
            .bind(token.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::store_write(format!("Failed to save token: {}", e)))?;

        tracing::debug!(token_id = %token.id, table = %self.table, "Token inserted");
        Ok(token)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Token>, DomainError> {
        let query = format!("SELECT {} FROM `{}` WHERE id = ? LIMIT 1", TOKEN_COLUMNS, self.table);

        let result = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::store_read(format!("Failed to find token by id: {}", e)))?;

        result.as_ref().map(Self::row_to_token).transpose()
    }

    async fn find_by_token(
        &self,
        token: &str,
        token_type: Option<&str>,
    ) -> Result<Option<Token>, DomainError> {
        let mut builder: QueryBuilder<MySql> =
            QueryBuilder::new(format!("SELECT {} FROM `{}` WHERE token = ", TOKEN_COLUMNS, self.table));
        builder.push_bind(token);
        if let Some(token_type) = token_type {
            builder.push(" AND `type` = ").push_bind(token_type);
        }
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT 1");

        let result = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::store_read(format!("Failed to find token: {}", e)))?;

        result.as_ref().map(Self::row_to_token).transpose()
    }

    async fn increment_usage(&self, id: Uuid) -> Result<(), DomainError> {
        let query = format!(
            "UPDATE `{}` SET usage_count = usage_count + 1, updated_at = ? \
             WHERE id = ? AND usage_count < {}",
            self.table,
            u32::MAX
        );

        let result = sqlx::query(&query)
            .bind(Self::timestamp())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::store_write(format!("Failed to increment token usage: {}", e)))?;

        if result.rows_affected() == 0 {
            return match self.stored_usage_count(id).await? {
                None => Err(DomainError::not_found(format!("token {}", id))),
                Some(_) => Err(DomainError::overflow("usage_count")),
            };
        }
        Ok(())
    }

    async fn increment_usage_if_valid(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, DomainError> {
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(format!(
            "UPDATE `{}` SET usage_count = usage_count + 1, updated_at = ",
            self.table
        ));
        builder
            .push_bind(now.trunc_subsecs(6))
            .push(" WHERE id = ")
            .push_bind(id.to_string())
            .push(format!(" AND usage_count < {} AND ", u32::MAX));
        query_builder::push_validity(&mut builder, now);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::store_write(format!("Failed to consume token: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_expired_at(
        &self,
        id: Uuid,
        expired_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let query = format!("UPDATE `{}` SET expired_at = ?, updated_at = ? WHERE id = ?", self.table);

        let result = sqlx::query(&query)
            .bind(expired_at.trunc_subsecs(6))
            .bind(updated_at.trunc_subsecs(6))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::store_write(format!("Failed to set token expiration: {}", e)))?;

        if result.rows_affected() == 0 && self.stored_usage_count(id).await?.is_none() {
            return Err(DomainError::not_found(format!("token {}", id)));
        }
        Ok(())
    }

    async fn save(&self, token: &Token) -> Result<(), DomainError> {
        let query = format!(
            "UPDATE `{}` SET token = ?, expired_at = ?, max_usage_limit = ?, data = ?, `type` = ?, \
             tokenable_type = ?, tokenable_id = ?, updated_at = ? WHERE id = ?",
            self.table
        );

        let result = sqlx::query(&query)
            .bind(&token.token)
            .bind(token.expired_at.map(|at| at.trunc_subsecs(6)))
            .bind(token.max_usage_limit)
            .bind(Self::encode_data(&token.data))
            .bind(&token.token_type)
            .bind(token.tokenable.as_ref().map(|owner| owner.kind.as_str().to_string()))
            .bind(token.tokenable.as_ref().map(|owner| owner.id.clone()))
            .bind(token.updated_at.trunc_subsecs(6))
            .bind(token.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::store_write(format!("Failed to save token: {}", e)))?;

        // MySQL reports changed rows, so an identical write affects none
        if result.rows_affected() == 0 && self.stored_usage_count(token.id).await?.is_none() {
            return Err(DomainError::not_found(format!("token {}", token.id)));
        }
        Ok(())
    }

    fn query<'a>(&'a self, query: &'a TokenQuery) -> TokenStream<'a> {
        Box::pin(async_stream::stream! {
            let mut builder = query_builder::select_tokens(&self.table, query);
            let mut rows = builder.build().fetch(&self.pool);
            while let Some(row) = rows.next().await {
                let token: Result<Token, DomainError> = row
                    .map_err(|e| DomainError::store_read(format!("Failed to query tokens: {}", e)))
                    .and_then(|row| Self::row_to_token(&row));
                yield token;
            }
        })
    }

    async fn count(&self, query: &TokenQuery) -> Result<usize, DomainError> {
        let count: i64 = query_builder::count_tokens(&self.table, query)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::store_read(format!("Failed to count tokens: {}", e)))?;

        let count = usize::try_from(count).unwrap_or(0);
        Ok(match query.limit {
            Some(limit) => count.min(usize::try_from(limit).unwrap_or(usize::MAX)),
            None => count,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let query = format!("DELETE FROM `{}` WHERE id = ?", self.table);

        let result = sqlx::query(&query)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::store_write(format!("Failed to delete token: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let query = format!(
            "DELETE FROM `{}` WHERE expired_at IS NOT NULL AND expired_at < ?",
            self.table
        );

        let result = sqlx::query(&query)
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::store_write(format!("Failed to delete expired tokens: {}", e)))?;

        let deleted = usize::try_from(result.rows_affected()).unwrap_or(usize::MAX);
        tracing::debug!(deleted, %cutoff, "Expired tokens deleted");
        Ok(deleted)
    }
}
