//! Unit tests for the in-memory token repository

use chrono::{Duration, Utc};
use futures::TryStreamExt;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::owner::OwnerRef;
use crate::domain::entities::token::NewToken;
use crate::domain::value_objects::TokenQuery;
use crate::errors::DomainError;
use crate::repositories::token::{InMemoryTokenRepository, TokenRepository};

fn new_token(value: &str, token_type: &str) -> NewToken {
    NewToken {
        token: value.to_string(),
        token_type: token_type.to_string(),
        expired_at: None,
        max_usage_limit: 0,
        data: json!({"source": "test"}),
        tokenable: Some(OwnerRef::user(1)),
    }
}

#[tokio::test]
async fn test_create_assigns_identity_and_defaults() {
    let repo = InMemoryTokenRepository::new();

    let token = repo.create(new_token("abc", "invite")).await.unwrap();

    assert_eq!(token.usage_count, 0);
    assert_eq!(token.token, "abc");
    assert_eq!(token.data["source"], "test");
    assert_eq!(token.created_at, token.updated_at);

    let found = repo.find_by_id(token.id).await.unwrap();
    assert_eq!(found, Some(token));
}

#[tokio::test]
async fn test_find_missing_returns_none() {
    let repo = InMemoryTokenRepository::new();
    assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    assert!(repo.find_by_token("nope", None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_by_token_respects_type() {
    let repo = InMemoryTokenRepository::new();
    let invite = repo.create(new_token("shared", "invite")).await.unwrap();
    let otp = repo.create(new_token("shared", "otp")).await.unwrap();

    let found = repo.find_by_token("shared", Some("invite")).await.unwrap().unwrap();
    assert_eq!(found.id, invite.id);

    let found = repo.find_by_token("shared", Some("otp")).await.unwrap().unwrap();
    assert_eq!(found.id, otp.id);

    assert!(repo.find_by_token("shared", None).await.unwrap().is_some());
}

#[tokio::test]
async fn test_increment_usage() {
    let repo = InMemoryTokenRepository::new();
    let token = repo.create(new_token("abc", "invite")).await.unwrap();

    for _ in 0..3 {
        repo.increment_usage(token.id).await.unwrap();
    }

    let stored = repo.find_by_id(token.id).await.unwrap().unwrap();
    assert_eq!(stored.usage_count, 3);
}

#[tokio::test]
async fn test_increment_missing_token_is_not_found() {
    let repo = InMemoryTokenRepository::new();
    let result = repo.increment_usage(Uuid::new_v4()).await;
    assert!(matches!(result, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn test_increment_overflow() {
    let repo = InMemoryTokenRepository::new();
    let mut token = repo.create(new_token("abc", "invite")).await.unwrap();
    token.usage_count = u32::MAX;
    repo.insert(token.clone()).await;

    let result = repo.increment_usage(token.id).await;
    assert!(matches!(result, Err(DomainError::Overflow { .. })));

    let stored = repo.find_by_id(token.id).await.unwrap().unwrap();
    assert_eq!(stored.usage_count, u32::MAX);
}

#[tokio::test]
async fn test_conditional_increment_stops_at_limit() {
    let repo = InMemoryTokenRepository::new();
    let mut limited = new_token("abc", "otp");
    limited.max_usage_limit = 2;
    let token = repo.create(limited).await.unwrap();
    let now = Utc::now();

    assert!(repo.increment_usage_if_valid(token.id, now).await.unwrap());
    assert!(repo.increment_usage_if_valid(token.id, now).await.unwrap());
    assert!(!repo.increment_usage_if_valid(token.id, now).await.unwrap());
    assert!(!repo.increment_usage_if_valid(Uuid::new_v4(), now).await.unwrap());

    let stored = repo.find_by_id(token.id).await.unwrap().unwrap();
    assert_eq!(stored.usage_count, 2);
}

#[tokio::test]
async fn test_conditional_increment_rejects_expired() {
    let repo = InMemoryTokenRepository::new();
    let mut expiring = new_token("abc", "otp");
    let now = Utc::now();
    expiring.expired_at = Some(now);
    let token = repo.create(expiring).await.unwrap();

    assert!(!repo.increment_usage_if_valid(token.id, now).await.unwrap());
    assert!(repo
        .increment_usage_if_valid(token.id, now - Duration::seconds(1))
        .await
        .unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_are_not_lost() {
    let repo = Arc::new(InMemoryTokenRepository::new());
    let id = repo.create(new_token("abc", "invite")).await.unwrap().id;

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.increment_usage(id).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.usage_count, 50);
}

#[tokio::test]
async fn test_save_overwrites_fields() {
    let repo = InMemoryTokenRepository::new();
    let mut token = repo.create(new_token("abc", "invite")).await.unwrap();

    let expiry = Utc::now() + Duration::hours(2);
    token.expired_at = Some(expiry);
    repo.save(&token).await.unwrap();

    let stored = repo.find_by_id(token.id).await.unwrap().unwrap();
    assert_eq!(stored.expired_at, Some(expiry));
    assert!(stored.updated_at >= token.updated_at);
}

#[tokio::test]
async fn test_save_keeps_stored_usage_count() {
    let repo = InMemoryTokenRepository::new();
    let stale = repo.create(new_token("abc", "invite")).await.unwrap();
    repo.increment_usage(stale.id).await.unwrap();
    repo.increment_usage(stale.id).await.unwrap();

    repo.save(&stale).await.unwrap();

    let stored = repo.find_by_id(stale.id).await.unwrap().unwrap();
    assert_eq!(stored.usage_count, 2);
}

#[tokio::test]
async fn test_save_missing_token_is_not_found() {
    let repo = InMemoryTokenRepository::new();
    let mut token = repo.create(new_token("abc", "invite")).await.unwrap();
    repo.delete(token.id).await.unwrap();

    token.max_usage_limit = 4;
    let result = repo.save(&token).await;
    assert!(matches!(result, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn test_set_expired_at_touches_only_expiration() {
    let repo = InMemoryTokenRepository::new();
    let token = repo.create(new_token("abc", "invite")).await.unwrap();
    repo.increment_usage(token.id).await.unwrap();

    let expiry = Utc::now() + Duration::hours(1);
    let updated_at = Utc::now();
    repo.set_expired_at(token.id, expiry, updated_at).await.unwrap();

    let stored = repo.find_by_id(token.id).await.unwrap().unwrap();
    assert_eq!(stored.expired_at, Some(expiry));
    assert_eq!(stored.updated_at, updated_at);
    assert_eq!(stored.usage_count, 1);
    assert_eq!(stored.token, token.token);
    assert_eq!(stored.data, token.data);

    repo.delete(token.id).await.unwrap();
    let result = repo.set_expired_at(token.id, expiry, updated_at).await;
    assert!(matches!(result, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn test_failed_writes_surface_store_write() {
    let repo = InMemoryTokenRepository::new();
    let token = repo.create(new_token("abc", "invite")).await.unwrap();
    repo.set_fail_writes(true);

    assert!(matches!(
        repo.create(new_token("def", "invite")).await,
        Err(DomainError::StoreWrite { .. })
    ));
    assert!(matches!(
        repo.increment_usage(token.id).await,
        Err(DomainError::StoreWrite { .. })
    ));
    assert!(matches!(repo.save(&token).await, Err(DomainError::StoreWrite { .. })));

    repo.set_fail_writes(false);
    repo.increment_usage(token.id).await.unwrap();
}

#[tokio::test]
async fn test_query_filters_and_limits() {
    let repo = InMemoryTokenRepository::new();
    for i in 0..5 {
        repo.create(new_token(&format!("invite-{i}"), "invite")).await.unwrap();
    }
    repo.create(new_token("otp-0", "otp")).await.unwrap();

    let invites: Vec<_> = repo
        .query(&TokenQuery::new().with_type("invite"))
        .try_collect()
        .await
        .unwrap();
    assert_eq!(invites.len(), 5);
    assert!(invites.iter().all(|t| t.token_type == "invite"));

    let limited: Vec<_> = repo
        .query(&TokenQuery::new().with_limit(2))
        .try_collect()
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);

    assert_eq!(repo.count(&TokenQuery::new()).await.unwrap(), 6);
    assert_eq!(repo.count(&TokenQuery::new().with_token("otp-0")).await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_expired_before() {
    let repo = InMemoryTokenRepository::new();
    let now = Utc::now();

    let mut old = new_token("old", "invite");
    old.expired_at = Some(now - Duration::days(10));
    let mut recent = new_token("recent", "invite");
    recent.expired_at = Some(now - Duration::hours(1));
    let open = new_token("open", "invite");

    repo.create(old).await.unwrap();
    repo.create(recent).await.unwrap();
    repo.create(open).await.unwrap();

    let deleted = repo.delete_expired_before(now - Duration::days(1)).await.unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(repo.len().await, 2);
    assert!(repo.find_by_token("old", None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete() {
    let repo = InMemoryTokenRepository::new();
    let token = repo.create(new_token("abc", "invite")).await.unwrap();

    assert!(repo.delete(token.id).await.unwrap());
    assert!(!repo.delete(token.id).await.unwrap());
    assert!(repo.is_empty().await);
}
