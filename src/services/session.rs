//! Session service
//!
//! Owns the lifecycle of authenticated sessions: creation after the identity
//! provider callback, validation on every request, rolling renewal, and
//! invalidation on logout.
//!
//! Validation is called exactly once per request, from the session
//! middleware; the result rides in the request's extensions so handlers and
//! extractors never trigger a second store lookup (see `api::middleware`).

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// A validated session together with its user.
///
/// `fresh` is set when the session's expiry was pushed out during this
/// validation, which means the client cookie must be re-issued with the new
/// validity window.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub session: Session,
    pub user: User,
    pub fresh: bool,
}

/// Session service for managing authenticated sessions
pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
    users: Arc<dyn UserRepository>,
    lifetime: Duration,
}

impl SessionService {
    /// Create a new session service with the given session lifetime
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        users: Arc<dyn UserRepository>,
        lifetime_days: i64,
    ) -> Self {
        Self {
            sessions,
            users,
            lifetime: Duration::days(lifetime_days),
        }
    }

    /// The configured session lifetime
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Create a session for a user who just completed the identity exchange.
    ///
    /// The token is a v4 UUID: random per the operating system's CSPRNG, so
    /// statistically unique and not guessable from prior tokens.
    pub async fn create(&self, user_id: i64) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + self.lifetime,
            created_at: now,
        };

        self.sessions
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(session)
    }

    /// Validate a session token, applying rolling renewal.
    ///
    /// Returns `None` when the token is unknown, expired, or its user no
    /// longer exists; expired and orphaned rows are cleaned up on the way
    /// out. When the session has passed the renewal threshold its expiry is
    /// extended by the full lifetime and the result is flagged `fresh`.
    pub async fn validate(&self, token: &str) -> Result<Option<ResolvedSession>> {
        let mut session = match self
            .sessions
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.sessions.delete(token).await;
            return Ok(None);
        }

        let user = match self
            .users
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")?
        {
            Some(u) => u,
            None => {
                // User deleted out from under the session
                let _ = self.sessions.delete(token).await;
                return Ok(None);
            }
        };

        let fresh = session.is_fresh(self.lifetime);
        if fresh {
            let new_expiry = Utc::now() + self.lifetime;
            self.sessions
                .update_expiry(token, new_expiry)
                .await
                .context("Failed to renew session")?;
            session.expires_at = new_expiry;
        }

        Ok(Some(ResolvedSession {
            session,
            user,
            fresh,
        }))
    }

    /// Invalidate a session. Invalidating an already-gone session is Ok.
    pub async fn invalidate(&self, token: &str) -> Result<()> {
        self.sessions
            .delete(token)
            .await
            .context("Failed to delete session")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup() -> (DynDatabasePool, SessionService, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user_id = users
            .create("g-1", "Alice", "alice@example.com")
            .await
            .expect("Failed to create user")
            .id;

        let service = SessionService::new(
            SqlxSessionRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
            30,
        );
        (pool, service, user_id)
    }

    #[tokio::test]
    async fn test_create_and_validate() {
        let (_pool, service, user_id) = setup().await;

        let session = service.create(user_id).await.expect("Failed to create");
        assert!(!session.id.is_empty());

        let resolved = service
            .validate(&session.id)
            .await
            .expect("Validation errored")
            .expect("Session should resolve");
        assert_eq!(resolved.user.id, user_id);
        assert_eq!(resolved.user.name, "Alice");
        // Just created: full lifetime remaining, no renewal
        assert!(!resolved.fresh);
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let (_pool, service, user_id) = setup().await;

        let a = service.create(user_id).await.unwrap();
        let b = service.create(user_id).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_validate_unknown_token() {
        let (_pool, service, _user_id) = setup().await;

        let resolved = service
            .validate("no-such-token")
            .await
            .expect("Validation errored");
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_validate_expired_session_cleans_up() {
        let (pool, service, user_id) = setup().await;

        // Insert an already-expired row directly
        let sessions = SqlxSessionRepository::new(pool.clone());
        use crate::db::repositories::SessionRepository;
        let expired = Session {
            id: "expired-token".to_string(),
            user_id,
            expires_at: Utc::now() - Duration::hours(1),
            created_at: Utc::now() - Duration::days(31),
        };
        sessions.create(&expired).await.unwrap();

        let resolved = service.validate("expired-token").await.unwrap();
        assert!(resolved.is_none());

        // The expired row was removed
        assert!(sessions.get_by_id("expired-token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_validate_renews_fresh_session() {
        let (pool, service, user_id) = setup().await;

        // A session past the renewal threshold (5 of 30 days remaining)
        let sessions = SqlxSessionRepository::new(pool.clone());
        use crate::db::repositories::SessionRepository;
        let stale = Session {
            id: "renewable-token".to_string(),
            user_id,
            expires_at: Utc::now() + Duration::days(5),
            created_at: Utc::now() - Duration::days(25),
        };
        sessions.create(&stale).await.unwrap();

        let resolved = service
            .validate("renewable-token")
            .await
            .unwrap()
            .expect("Session should resolve");
        assert!(resolved.fresh);

        // Expiry pushed out to roughly a full lifetime from now
        let remaining = resolved.session.expires_at - Utc::now();
        assert!(remaining > Duration::days(29));

        // And persisted
        let stored = sessions.get_by_id("renewable-token").await.unwrap().unwrap();
        assert!(stored.expires_at - Utc::now() > Duration::days(29));
    }

    #[tokio::test]
    async fn test_validate_after_user_deleted() {
        let (pool, service, user_id) = setup().await;

        let session = service.create(user_id).await.unwrap();

        let users = SqlxUserRepository::new(pool.clone());
        users.delete(user_id).await.expect("Failed to delete user");

        let resolved = service.validate(&session.id).await.unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let (_pool, service, user_id) = setup().await;

        let session = service.create(user_id).await.unwrap();

        service.invalidate(&session.id).await.expect("First invalidate failed");
        service
            .invalidate(&session.id)
            .await
            .expect("Second invalidate must not error");

        assert!(service.validate(&session.id).await.unwrap().is_none());
    }
}
