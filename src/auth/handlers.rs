use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, RegisterRequest},
        extractors::AuthUser,
        services::RegisterInput,
    },
    error::{AuthError, ErrorResponse},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/ping", post(ping))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    tag = "Users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered"),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "User already exists", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<StatusCode, AuthError> {
    let Json(mut payload) = payload.map_err(bad_body)?;
    payload.email = payload.email.trim().to_lowercase();
    let email = payload.email.clone();

    let result = state
        .auth
        .register(RegisterInput {
            email: payload.email,
            username: payload.username,
            password: payload.password,
        })
        .await;

    match result {
        Ok(()) => {
            info!(email = %email, "user registered");
            Ok(StatusCode::CREATED)
        }
        Err(e) => {
            report("register", &email, &e);
            Err(e)
        }
    }
}

/// Log in and receive an access token
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Json(mut payload) = payload.map_err(bad_body)?;
    payload.email = payload.email.trim().to_lowercase();

    match state.auth.login(&payload.email, &payload.password).await {
        Ok(tokens) => {
            info!(email = %payload.email, expires_at = %tokens.access_token.expires_at, "user logged in");
            Ok(Json(LoginResponse {
                access_token: tokens.access_token.token,
            }))
        }
        Err(e) => {
            report("login", &payload.email, &e);
            Err(e)
        }
    }
}

/// Check that a bearer token is accepted
#[utoipa::path(
    post,
    path = "/api/v1/users/ping",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Token accepted", body = String),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn ping(AuthUser(user_id): AuthUser) -> &'static str {
    debug!(%user_id, "ping");
    "pong"
}

fn bad_body(rejection: JsonRejection) -> AuthError {
    warn!(error = %rejection.body_text(), "malformed request body");
    AuthError::validation(rejection.body_text())
}

fn report(op: &'static str, email: &str, err: &AuthError) {
    if err.is_internal() {
        error!(op, email = %email, error = %error_chain(err), "request failed");
    } else {
        warn!(op, email = %email, error = %err, "request rejected");
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(source) = cur {
        out.push_str(": ");
        out.push_str(&source.to_string());
        cur = source.source();
    }
    out
}
