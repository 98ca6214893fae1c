// src/handlers/auth.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::user::{
        ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
        ResetPasswordRequest,
    },
    services::auth::AuthService,
    utils::jwt::Claims,
};

/// Registers a new user.
///
/// Returns 201 Created and the public profile.
pub async fn register(
    State(auth): State<AuthService>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let profile = auth.register(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful. You can now login.",
            "user": profile,
        })),
    ))
}

/// Authenticates a user and returns a JWT token with the profile.
pub async fn login(
    State(auth): State<AuthService>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(auth.login(payload).await?))
}

pub async fn forgot_password(
    State(auth): State<AuthService>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.forgot_password(payload).await?;

    Ok(Json(json!({
        "message": "If the email exists, a reset link will be sent"
    })))
}

pub async fn reset_password(
    State(auth): State<AuthService>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.reset_password(&token, payload).await?;

    Ok(Json(json!({ "message": "Password reset successful" })))
}

pub async fn change_password(
    State(auth): State<AuthService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.change_password(claims.user_id()?, payload).await?;

    Ok(Json(json!({ "message": "Password changed successfully" })))
}

/// Current user's profile.
pub async fn me(
    State(auth): State<AuthService>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(auth.me(claims.user_id()?).await?))
}
