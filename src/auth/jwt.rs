use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use uuid::Uuid;

use super::{
    claims::{AccessToken, Claims, RefreshToken},
    clock::Clock,
};
use crate::{
    config::JwtConfig,
    error::{AuthError, AuthResult},
};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Issues and verifies HS256 access tokens and opaque refresh identifiers.
///
/// Keys and TTLs are fixed at construction; share it behind an `Arc`.
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_ttl: TimeDuration,
    refresh_ttl: TimeDuration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(cfg: &JwtConfig, clock: Arc<dyn Clock>) -> AuthResult<Self> {
        if cfg.secret.is_empty() {
            return Err(AuthError::Config("empty signing key".into()));
        }
        if cfg.ttl_minutes == 0 {
            return Err(AuthError::Config("empty access token ttl".into()));
        }
        if cfg.refresh_ttl_minutes == 0 {
            return Err(AuthError::Config("empty refresh token ttl".into()));
        }

        let now = clock.now();
        let access_ttl = ttl_in_range(cfg.access_ttl(), now, "access")?;
        let refresh_ttl = ttl_in_range(cfg.refresh_ttl(), now, "refresh")?;

        // Expiry is checked against the injected clock, not the system time.
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.set_issuer(std::slice::from_ref(&cfg.issuer));
        validation.set_audience(std::slice::from_ref(&cfg.audience));

        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            validation,
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl,
            refresh_ttl,
            clock,
        })
    }

    pub fn issue_access_token(&self, user_id: Uuid) -> AuthResult<AccessToken> {
        let now = self.clock.now();
        let expires_at = expiry(now, self.access_ttl)?;
        let claims = Claims {
            sub: user_id,
            exp: expires_at.unix_timestamp(),
            iat: now.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AuthError::internal(anyhow::anyhow!("sign jwt: {e}")))?;
        Ok(AccessToken { token, expires_at })
    }

    /// Returns the subject of a valid token.
    ///
    /// Signature, algorithm and claim shape are checked before expiry, so a
    /// forged token is always `TokenInvalid` even when its `exp` has passed.
    pub fn verify_access_token(&self, token: &str) -> AuthResult<Uuid> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::TokenInvalid)?;
        if self.clock.now().unix_timestamp() > data.claims.exp {
            return Err(AuthError::TokenExpired);
        }
        Ok(data.claims.sub)
    }

    /// Fresh time-ordered identifier, not bound to any user.
    pub fn issue_refresh_token(&self) -> AuthResult<RefreshToken> {
        Ok(RefreshToken {
            id: Uuid::now_v7(),
            expires_at: expiry(self.clock.now(), self.refresh_ttl)?,
        })
    }

    /// Format check only: no expiry or revocation lookup backs refresh tokens.
    pub fn validate_refresh_token_format(&self, token: &str) -> AuthResult<Uuid> {
        Uuid::parse_str(token).map_err(|_| AuthError::TokenInvalid)
    }
}

fn ttl_in_range(
    ttl: Option<TimeDuration>,
    now: OffsetDateTime,
    kind: &str,
) -> AuthResult<TimeDuration> {
    match ttl {
        Some(ttl) if now.checked_add(ttl).is_some() => Ok(ttl),
        _ => Err(AuthError::Config(format!("{kind} token ttl out of range"))),
    }
}

fn expiry(now: OffsetDateTime, ttl: TimeDuration) -> AuthResult<OffsetDateTime> {
    now.checked_add(ttl)
        .ok_or_else(|| AuthError::internal(anyhow::anyhow!("token expiry out of range")))
}

#[cfg(test)]
pub(crate) fn test_jwt_config(secret: &str) -> JwtConfig {
    JwtConfig {
        secret: secret.into(),
        issuer: "test-issuer".into(),
        audience: "test-aud".into(),
        ttl_minutes: 15,
        refresh_ttl_minutes: 60 * 24 * 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::{FixedClock, SystemClock};
    use time::macros::datetime;

    fn make_manager(secret: &str) -> TokenManager {
        TokenManager::new(&test_jwt_config(secret), Arc::new(SystemClock)).expect("valid config")
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_manager("dev-secret");
        let user_id = Uuid::now_v7();
        let access = keys.issue_access_token(user_id).expect("sign access");
        assert_eq!(access.token.split('.').count(), 3);
        assert_eq!(keys.verify_access_token(&access.token).unwrap(), user_id);
    }

    #[test]
    fn expiry_is_now_plus_access_ttl() {
        let start = datetime!(2024-05-01 12:00 UTC);
        let clock = Arc::new(FixedClock::at(start));
        let keys = TokenManager::new(&test_jwt_config("dev-secret"), clock).unwrap();
        let access = keys.issue_access_token(Uuid::now_v7()).unwrap();
        assert_eq!(access.expires_at, start + TimeDuration::minutes(15));
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let clock = Arc::new(FixedClock::at(datetime!(2024-05-01 12:00 UTC)));
        let keys = TokenManager::new(&test_jwt_config("dev-secret"), clock.clone()).unwrap();
        let access = keys.issue_access_token(Uuid::now_v7()).unwrap();

        clock.advance(TimeDuration::minutes(15));
        assert!(keys.verify_access_token(&access.token).is_ok());

        clock.advance(TimeDuration::seconds(1));
        let err = keys.verify_access_token(&access.token).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn token_issued_in_the_past_fails_against_system_clock() {
        let past = Arc::new(FixedClock::at(datetime!(2020-01-01 0:00 UTC)));
        let issuer = TokenManager::new(&test_jwt_config("dev-secret"), past).unwrap();
        let access = issuer.issue_access_token(Uuid::now_v7()).unwrap();

        let err = make_manager("dev-secret")
            .verify_access_token(&access.token)
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn foreign_secret_is_invalid() {
        let token = make_manager("secret-a")
            .issue_access_token(Uuid::now_v7())
            .unwrap()
            .token;
        let err = make_manager("secret-b").verify_access_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[test]
    fn foreign_secret_beats_expiry() {
        let past = Arc::new(FixedClock::at(datetime!(2020-01-01 0:00 UTC)));
        let forger = TokenManager::new(&test_jwt_config("secret-a"), past).unwrap();
        let token = forger.issue_access_token(Uuid::now_v7()).unwrap().token;
        let err = make_manager("secret-b").verify_access_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[test]
    fn unexpected_algorithm_is_invalid() {
        let keys = make_manager("dev-secret");
        let claims = Claims {
            sub: Uuid::now_v7(),
            exp: time::OffsetDateTime::now_utc().unix_timestamp() + 600,
            iat: time::OffsetDateTime::now_utc().unix_timestamp(),
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"dev-secret"),
        )
        .unwrap();
        let err = keys.verify_access_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[test]
    fn missing_or_malformed_subject_is_invalid() {
        let keys = make_manager("dev-secret");
        let exp = time::OffsetDateTime::now_utc().unix_timestamp() + 600;
        let enc = EncodingKey::from_secret(b"dev-secret");

        let no_sub = serde_json::json!({ "exp": exp, "iss": "test-issuer", "aud": "test-aud" });
        let token = encode(&Header::new(ALGORITHM), &no_sub, &enc).unwrap();
        assert!(matches!(
            keys.verify_access_token(&token).unwrap_err(),
            AuthError::TokenInvalid
        ));

        let bad_sub = serde_json::json!({
            "sub": "alice", "exp": exp, "iat": exp - 600, "iss": "test-issuer", "aud": "test-aud"
        });
        let token = encode(&Header::new(ALGORITHM), &bad_sub, &enc).unwrap();
        assert!(matches!(
            keys.verify_access_token(&token).unwrap_err(),
            AuthError::TokenInvalid
        ));
    }

    #[test]
    fn wrong_issuer_or_audience_is_invalid() {
        let token = make_manager("same-secret")
            .issue_access_token(Uuid::now_v7())
            .unwrap()
            .token;
        let mut other = test_jwt_config("same-secret");
        other.issuer = "someone-else".into();
        let keys = TokenManager::new(&other, Arc::new(SystemClock)).unwrap();
        assert!(matches!(
            keys.verify_access_token(&token).unwrap_err(),
            AuthError::TokenInvalid
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        let keys = make_manager("dev-secret");
        for token in ["", "invalid.token.here", "a.b"] {
            assert!(matches!(
                keys.verify_access_token(token).unwrap_err(),
                AuthError::TokenInvalid
            ));
        }
    }

    #[test]
    fn construction_rejects_empty_secret_and_zero_ttls() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let err = TokenManager::new(&test_jwt_config(""), clock.clone()).unwrap_err();
        assert!(matches!(err, AuthError::Config(_)));

        let mut cfg = test_jwt_config("s");
        cfg.ttl_minutes = 0;
        assert!(matches!(
            TokenManager::new(&cfg, clock.clone()).unwrap_err(),
            AuthError::Config(_)
        ));

        let mut cfg = test_jwt_config("s");
        cfg.refresh_ttl_minutes = 0;
        assert!(matches!(
            TokenManager::new(&cfg, clock).unwrap_err(),
            AuthError::Config(_)
        ));
    }

    #[test]
    fn construction_rejects_ttls_past_the_calendar() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let mut cfg = test_jwt_config("s");
        cfg.ttl_minutes = 1_000_000_000_000;
        assert!(matches!(
            TokenManager::new(&cfg, clock.clone()).unwrap_err(),
            AuthError::Config(_)
        ));

        let mut cfg = test_jwt_config("s");
        cfg.ttl_minutes = u64::MAX;
        assert!(matches!(
            TokenManager::new(&cfg, clock.clone()).unwrap_err(),
            AuthError::Config(_)
        ));

        let mut cfg = test_jwt_config("s");
        cfg.refresh_ttl_minutes = 1_000_000_000_000;
        assert!(matches!(
            TokenManager::new(&cfg, clock).unwrap_err(),
            AuthError::Config(_)
        ));
    }

    #[test]
    fn expiry_past_the_calendar_is_internal_not_a_panic() {
        let clock = Arc::new(FixedClock::at(datetime!(9999-12-31 0:00 UTC)));
        let mut cfg = test_jwt_config("dev-secret");
        cfg.refresh_ttl_minutes = 15;
        let keys = TokenManager::new(&cfg, clock.clone()).unwrap();
        assert!(keys.issue_access_token(Uuid::now_v7()).is_ok());

        clock.advance(TimeDuration::minutes(23 * 60 + 50));
        assert!(matches!(
            keys.issue_access_token(Uuid::now_v7()).unwrap_err(),
            AuthError::Internal(_)
        ));
        assert!(matches!(
            keys.issue_refresh_token().unwrap_err(),
            AuthError::Internal(_)
        ));
    }

    #[test]
    fn refresh_tokens_are_fresh_and_time_ordered() {
        let start = datetime!(2024-05-01 12:00 UTC);
        let keys =
            TokenManager::new(&test_jwt_config("dev-secret"), Arc::new(FixedClock::at(start)))
                .unwrap();
        let a = keys.issue_refresh_token().unwrap();
        let b = keys.issue_refresh_token().unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.get_version_num(), 7);
        assert_eq!(a.expires_at, start + TimeDuration::days(30));
    }

    #[test]
    fn refresh_token_format_validation() {
        let keys = make_manager("dev-secret");
        let issued = keys.issue_refresh_token().unwrap();
        assert_eq!(
            keys.validate_refresh_token_format(&issued.id.to_string()).unwrap(),
            issued.id
        );
        assert!(matches!(
            keys.validate_refresh_token_format("not-a-uuid").unwrap_err(),
            AuthError::TokenInvalid
        ));
    }
}
