//! Unit tests for token cleanup

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tb_shared::TokenPolicyConfig;

use crate::domain::entities::token::NewToken;
use crate::repositories::{InMemoryTokenRepository, TokenRepository};
use crate::services::clock::FixedClock;
use crate::services::token::TokenCleanupService;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn policy(enabled: bool) -> TokenPolicyConfig {
    TokenPolicyConfig {
        cleanup_enabled: enabled,
        cleanup_grace_minutes: 60,
        ..TokenPolicyConfig::default()
    }
}

async fn seeded_repo() -> Arc<InMemoryTokenRepository> {
    let repo = Arc::new(InMemoryTokenRepository::new());
    let expirations = [
        Some(start() - Duration::hours(2)),
        Some(start() - Duration::minutes(30)),
        None,
    ];
    for (i, expired_at) in expirations.into_iter().enumerate() {
        let mut token = NewToken::builder(format!("token-{i}"), "invite")
            .build(start(), &TokenPolicyConfig::default())
            .unwrap();
        token.expired_at = expired_at;
        repo.create(token).await.unwrap();
    }
    repo
}

#[tokio::test]
async fn test_cleanup_respects_grace_period() {
    let repo = seeded_repo().await;
    let service = TokenCleanupService::with_clock(repo.clone(), FixedClock::new(start()), policy(true));

    assert_eq!(service.cutoff().unwrap(), start() - Duration::minutes(60));

    let result = service.run_cleanup().await.unwrap();

    assert!(result.is_success());
    assert_eq!(result.expired_tokens_deleted, 1);
    assert_eq!(repo.len().await, 2);
    assert!(repo.find_by_token("token-0", None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cleanup_disabled_deletes_nothing() {
    let repo = seeded_repo().await;
    let service = TokenCleanupService::with_clock(repo.clone(), FixedClock::new(start()), policy(false));

    let result = service.run_cleanup().await.unwrap();

    assert_eq!(result.expired_tokens_deleted, 0);
    assert_eq!(repo.len().await, 3);
    assert!(Arc::new(service).start_background_task().is_none());
}

#[tokio::test]
async fn test_cleanup_collects_store_errors() {
    let repo = seeded_repo().await;
    repo.set_fail_writes(true);
    let service = TokenCleanupService::with_clock(repo.clone(), FixedClock::new(start()), policy(true));

    let result = service.run_cleanup().await.unwrap();

    assert!(!result.is_success());
    assert_eq!(result.expired_tokens_deleted, 0);
    assert_eq!(repo.len().await, 3);
}

#[tokio::test]
async fn test_background_task_runs_cleanup() {
    let repo = seeded_repo().await;
    let service = Arc::new(TokenCleanupService::with_clock(
        repo.clone(),
        FixedClock::new(start()),
        policy(true),
    ));

    let handle = service.start_background_task().unwrap();
    for _ in 0..100 {
        if repo.len().await == 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    handle.abort();

    assert_eq!(repo.len().await, 2);
}
