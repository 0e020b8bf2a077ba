// src/repos/tokens.rs

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::token::{ConsumedToken, TokenKind};

/// Issues a fresh single-use token, superseding any previous token of the
/// same kind for the user.
pub async fn issue(
    pool: &SqlitePool,
    user_id: i64,
    kind: TokenKind,
    new_email: Option<&str>,
) -> sqlx::Result<String> {
    sqlx::query("DELETE FROM tokens WHERE user_id = ? AND kind = ?")
        .bind(user_id)
        .bind(kind.as_str())
        .execute(pool)
        .await?;

    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::hours(kind.ttl_hours());

    sqlx::query(
        "INSERT INTO tokens (user_id, token, kind, new_email, expires_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&token)
    .bind(kind.as_str())
    .bind(new_email)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(token)
}

/// Consumes a token: the row is deleted whether or not it is still valid,
/// and `None` is returned for unknown or expired tokens.
pub async fn consume(
    pool: &SqlitePool,
    token: &str,
    kind: TokenKind,
) -> sqlx::Result<Option<ConsumedToken>> {
    let row = sqlx::query_as::<_, ConsumedToken>(
        "DELETE FROM tokens WHERE token = ? AND kind = ?
         RETURNING user_id, new_email, expires_at",
    )
    .bind(token)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row.filter(|t| t.expires_at > Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::testutil::{seed_user, test_pool};

    #[tokio::test]
    async fn token_is_single_use() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "t1@example.com").await;

        let token = issue(&pool, user_id, TokenKind::EmailVerify, None).await.unwrap();

        let first = consume(&pool, &token, TokenKind::EmailVerify).await.unwrap();
        assert_eq!(first.unwrap().user_id, user_id);

        let second = consume(&pool, &token, TokenKind::EmailVerify).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn token_kind_must_match() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "t2@example.com").await;

        let token = issue(&pool, user_id, TokenKind::PasswordReset, None).await.unwrap();
        let wrong_kind = consume(&pool, &token, TokenKind::EmailVerify).await.unwrap();
        assert!(wrong_kind.is_none());
    }

    #[tokio::test]
    async fn reissuing_supersedes_the_previous_token() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "t3@example.com").await;

        let old = issue(&pool, user_id, TokenKind::EmailVerify, None).await.unwrap();
        let new = issue(&pool, user_id, TokenKind::EmailVerify, None).await.unwrap();

        assert!(consume(&pool, &old, TokenKind::EmailVerify).await.unwrap().is_none());
        assert!(consume(&pool, &new, TokenKind::EmailVerify).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "t4@example.com").await;

        sqlx::query(
            "INSERT INTO tokens (user_id, token, kind, expires_at) VALUES (?, 'stale', 'email_verify', ?)",
        )
        .bind(user_id)
        .bind(Utc::now() - Duration::hours(1))
        .execute(&pool)
        .await
        .unwrap();

        let consumed = consume(&pool, "stale", TokenKind::EmailVerify).await.unwrap();
        assert!(consumed.is_none());
    }

    #[tokio::test]
    async fn email_change_token_carries_the_pending_address() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "t5@example.com").await;

        let token = issue(&pool, user_id, TokenKind::EmailChange, Some("next@example.com"))
            .await
            .unwrap();
        let consumed = consume(&pool, &token, TokenKind::EmailChange)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(consumed.new_email.as_deref(), Some("next@example.com"));
    }
}
