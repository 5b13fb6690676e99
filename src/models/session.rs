//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Session entity for user authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (opaque token)
    pub id: String,
    /// Associated user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Check if the session is due for rolling renewal.
    ///
    /// A session is "fresh" once less than half of `lifetime` remains until
    /// expiry; a fresh session gets its expiry pushed out by the full
    /// lifetime and the client cookie re-issued.
    pub fn is_fresh(&self, lifetime: Duration) -> bool {
        self.expires_at - Utc::now() < lifetime / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_expiring_in(remaining: Duration) -> Session {
        let now = Utc::now();
        Session {
            id: "token".to_string(),
            user_id: 1,
            expires_at: now + remaining,
            created_at: now,
        }
    }

    #[test]
    fn test_is_expired() {
        assert!(session_expiring_in(Duration::hours(-1)).is_expired());
        assert!(!session_expiring_in(Duration::hours(1)).is_expired());
    }

    #[test]
    fn test_freshness_window() {
        let lifetime = Duration::days(30);

        // Just created: full lifetime remaining, not fresh
        assert!(!session_expiring_in(Duration::days(30)).is_fresh(lifetime));
        // Past the halfway point: fresh, should be renewed
        assert!(session_expiring_in(Duration::days(14)).is_fresh(lifetime));
        assert!(session_expiring_in(Duration::days(1)).is_fresh(lifetime));
    }
}
