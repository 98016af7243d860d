use serde::{Deserialize, Serialize};

/// The marketplace OAuth credential. A single row of this exists per
/// integration; every refresh overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MeliToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry, epoch milliseconds.
    pub expires_at: i64,
}

impl MeliToken {
    /// True while the access token stays valid for at least `margin_ms`
    /// beyond `now_ms`.
    pub fn is_fresh(&self, now_ms: i64, margin_ms: i64) -> bool {
        self.expires_at > now_ms.saturating_add(margin_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: i64) -> MeliToken {
        MeliToken {
            access_token: "APP_USR-1".into(),
            refresh_token: "TG-1".into(),
            expires_at,
        }
    }

    #[test]
    fn test_fresh_only_beyond_margin() {
        let now = 1_700_000_000_000;
        let margin = 5 * 60 * 1000;
        assert!(token(now + margin + 1).is_fresh(now, margin));
        assert!(!token(now + margin).is_fresh(now, margin));
        assert!(!token(now - 1).is_fresh(now, margin));
    }
}
