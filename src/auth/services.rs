use std::{future::Future, sync::Arc, time::Duration};

use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use crate::{
    auth::{
        claims::{AccessToken, RefreshToken},
        jwt::TokenManager,
        password::CredentialHasher,
        repo::{StoreError, UserStore},
        repo_types::NewUser,
    },
    error::{AuthError, AuthResult},
};

pub const EMAIL_MAX_LEN: usize = 255;
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 32;
pub const PASSWORD_MIN_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Result of a successful login. `refresh_token` is always `None` for now.
#[derive(Debug, Clone)]
pub struct Tokens {
    pub access_token: AccessToken,
    pub refresh_token: Option<RefreshToken>,
}

/// Registration and login on top of a [`UserStore`].
///
/// Holds no mutable state; clone it freely across tasks. Store and hashing
/// calls are bounded by `op_timeout` and are never retried. Nothing here
/// logs: callers decide what an error is worth.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: Arc<CredentialHasher>,
    tokens: Arc<TokenManager>,
    op_timeout: Duration,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<CredentialHasher>,
        tokens: Arc<TokenManager>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            op_timeout,
        }
    }

    pub async fn register(&self, input: RegisterInput) -> AuthResult<()> {
        validate_registration(&input)?;

        let RegisterInput {
            email,
            username,
            password,
        } = input;
        let id = Uuid::now_v7();
        let password_hash = self.hash_password(password).await?;

        let user = NewUser {
            id,
            username: username.trim().to_owned(),
            email,
            password_hash,
        };
        match self.bounded("user store", self.store.create(&user)).await? {
            Ok(()) => Ok(()),
            Err(StoreError::Duplicate) => Err(AuthError::AlreadyExists),
            Err(e) => Err(AuthError::internal(
                anyhow::Error::new(e).context("create user"),
            )),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<Tokens> {
        validate_login(email, password)?;

        let user = match self.bounded("user store", self.store.get_by_email(email)).await? {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                // pay for a verification anyway so a miss is not faster
                self.verify_password(self.hasher.dummy_hash().to_owned(), password.to_owned())
                    .await?;
                return Err(AuthError::NotFound);
            }
            Err(e) => {
                return Err(AuthError::internal(
                    anyhow::Error::new(e).context("get user by email"),
                ))
            }
        };

        if !self
            .verify_password(user.password_hash, password.to_owned())
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.tokens.issue_access_token(user.id)?;
        Ok(Tokens {
            access_token,
            refresh_token: None,
        })
    }

    pub fn verify_access_token(&self, token: &str) -> AuthResult<Uuid> {
        self.tokens.verify_access_token(token)
    }

    async fn hash_password(&self, password: String) -> AuthResult<String> {
        let hasher = Arc::clone(&self.hasher);
        let task = tokio::task::spawn_blocking(move || hasher.hash(&password));
        self.bounded("password hashing", task)
            .await?
            .map_err(|e| AuthError::internal(anyhow::anyhow!("hashing task: {e}")))?
    }

    async fn verify_password(&self, hash: String, password: String) -> AuthResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        let task = tokio::task::spawn_blocking(move || hasher.verify(&hash, &password));
        self.bounded("password verification", task)
            .await?
            .map_err(|e| AuthError::internal(anyhow::anyhow!("verify task: {e}")))?
    }

    async fn bounded<F: Future>(&self, what: &'static str, fut: F) -> AuthResult<F::Output> {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| AuthError::Timeout(what))
    }
}

fn validate_email(email: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::validation("email is required"));
    }
    if email.chars().count() > EMAIL_MAX_LEN {
        return Err(AuthError::validation(format!(
            "email must be at most {EMAIL_MAX_LEN} characters"
        )));
    }
    if !is_valid_email(email) {
        return Err(AuthError::validation("invalid email"));
    }
    Ok(())
}

fn validate_registration(input: &RegisterInput) -> AuthResult<()> {
    validate_email(&input.email)?;

    let username = input.username.trim();
    if username.is_empty() {
        return Err(AuthError::validation("username is required"));
    }
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(AuthError::validation(format!(
            "username must be {USERNAME_MIN_LEN} to {USERNAME_MAX_LEN} characters"
        )));
    }

    if input.password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AuthError::validation(format!(
            "password must be at least {PASSWORD_MIN_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_login(email: &str, password: &str) -> AuthResult<()> {
    validate_email(email)?;
    if password.is_empty() {
        return Err(AuthError::validation("password is required"));
    }
    Ok(())
}
