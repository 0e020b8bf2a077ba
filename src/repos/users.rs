// src/repos/users.rs

use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::user::User;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, auth_provider, \
     provider_subject, is_verified, is_deleted, created_at";

/// Inserts a local-credentials account. The unique email constraint is the
/// caller's signal for an already-registered address.
pub async fn create_local(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> sqlx::Result<User> {
    let sql = format!(
        "INSERT INTO users (name, email, password_hash, role, auth_provider, is_verified, is_deleted, created_at)
         VALUES (?, ?, ?, 'user', 'local', 0, 0, ?)
         RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
}

/// Live account by id. Soft-deleted rows are invisible here.
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? AND is_deleted = 0");
    sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(pool).await
}

/// Live account by email address.
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> sqlx::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? AND is_deleted = 0");
    sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(pool)
        .await
}

pub async fn set_verified(pool: &SqlitePool, user_id: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET is_verified = 1 WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_password(pool: &SqlitePool, user_id: i64, password_hash: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Applies a confirmed email change. The confirmation link proves the new
/// address, so the verification flag is set in the same statement.
pub async fn update_email(pool: &SqlitePool, user_id: i64, email: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET email = ?, is_verified = 1 WHERE id = ?")
        .bind(email)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Soft delete: the row stays for referential integrity, the PII does not.
/// The placeholder address is derived from the id to keep the unique index
/// happy.
pub async fn soft_delete(pool: &SqlitePool, user_id: i64) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE users
         SET is_deleted = 1,
             name = 'Deleted account',
             email = 'deleted-' || id || '@invalid.local',
             password_hash = NULL,
             provider_subject = NULL
         WHERE id = ?",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Find-or-create for Google sign-in, keyed on the provider subject id.
/// An existing local account with the same address gets the identity linked
/// instead of a duplicate row.
pub async fn link_or_create_google(
    pool: &SqlitePool,
    subject: &str,
    email: &str,
    name: Option<&str>,
) -> sqlx::Result<User> {
    let by_subject = format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE auth_provider = 'google' AND provider_subject = ? AND is_deleted = 0"
    );
    if let Some(user) = sqlx::query_as::<_, User>(&by_subject)
        .bind(subject)
        .fetch_optional(pool)
        .await?
    {
        return Ok(user);
    }

    if let Some(existing) = find_by_email(pool, email).await? {
        let link = format!(
            "UPDATE users
             SET auth_provider = 'google', provider_subject = ?, is_verified = 1
             WHERE id = ?
             RETURNING {USER_COLUMNS}"
        );
        return sqlx::query_as::<_, User>(&link)
            .bind(subject)
            .bind(existing.id)
            .fetch_one(pool)
            .await;
    }

    let insert = format!(
        "INSERT INTO users (name, email, password_hash, role, auth_provider, provider_subject, is_verified, is_deleted, created_at)
         VALUES (?, ?, NULL, 'user', 'google', ?, 1, 0, ?)
         RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, User>(&insert)
        .bind(name.unwrap_or("Student"))
        .bind(email)
        .bind(subject)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::testutil::test_pool;

    #[tokio::test]
    async fn created_account_is_found_by_email() {
        let pool = test_pool().await;

        let user = create_local(&pool, "Jan Kowalski", "jan@example.com", "hash")
            .await
            .unwrap();
        assert_eq!(user.auth_provider, "local");
        assert!(!user.is_verified);

        let found = find_by_email(&pool, "jan@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_email_violates_unique_constraint() {
        let pool = test_pool().await;
        create_local(&pool, "A", "dup@example.com", "h").await.unwrap();

        let err = create_local(&pool, "B", "dup@example.com", "h")
            .await
            .unwrap_err();
        let db_err = err.as_database_error().expect("database error");
        assert!(db_err.is_unique_violation());
    }

    #[tokio::test]
    async fn soft_deleted_account_disappears_and_loses_pii() {
        let pool = test_pool().await;
        let user = create_local(&pool, "Gone Soon", "gone@example.com", "h")
            .await
            .unwrap();

        soft_delete(&pool, user.id).await.unwrap();

        assert!(find_by_email(&pool, "gone@example.com").await.unwrap().is_none());
        assert!(find_by_id(&pool, user.id).await.unwrap().is_none());

        let (name, email): (String, String) =
            sqlx::query_as("SELECT name, email FROM users WHERE id = ?")
                .bind(user.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(name, "Deleted account");
        assert!(!email.contains("gone@"));
    }

    #[tokio::test]
    async fn google_login_links_existing_local_account_by_email() {
        let pool = test_pool().await;
        let local = create_local(&pool, "Linked", "link@example.com", "h")
            .await
            .unwrap();

        let linked = link_or_create_google(&pool, "sub-123", "link@example.com", Some("Linked"))
            .await
            .unwrap();
        assert_eq!(linked.id, local.id);
        assert_eq!(linked.auth_provider, "google");
        assert!(linked.is_verified);

        // Second login resolves through the subject id.
        let again = link_or_create_google(&pool, "sub-123", "link@example.com", None)
            .await
            .unwrap();
        assert_eq!(again.id, local.id);
    }

    #[tokio::test]
    async fn google_login_creates_fresh_account_when_unknown() {
        let pool = test_pool().await;
        let user = link_or_create_google(&pool, "sub-999", "new@example.com", Some("New"))
            .await
            .unwrap();
        assert_eq!(user.auth_provider, "google");
        assert!(user.password_hash.is_none());
    }
}
