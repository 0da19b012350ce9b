//! Google Calendar OAuth endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::{resolve_user_id, AuthenticatedUser};
use crate::routes::extract::ApiQuery;
use crate::services::google::{GoogleCalendarClient, GoogleError, GoogleToken};
use crate::AppState;

pub(crate) fn google_client(state: &AppState) -> Result<&Arc<GoogleCalendarClient>> {
    state
        .google
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("Google Calendar is not configured".to_string()))
}

/// Load the user's token, refreshing and persisting it when near expiry.
pub(crate) async fn fresh_token(
    state: &AppState,
    client: &GoogleCalendarClient,
    user_id: &str,
) -> Result<GoogleToken> {
    let raw = state
        .db
        .get_google_token(user_id)
        .await?
        .ok_or(GoogleError::NotConnected)?;
    let token = GoogleToken::from_json(&raw)?;

    let (token, refreshed) = client.ensure_fresh(token).await?;
    if refreshed {
        state
            .db
            .set_google_token(user_id, Some(token.to_json()?.as_str()))
            .await?;
    }

    Ok(token)
}

/// GET /api/auth/google/login
pub async fn login(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<GoogleLoginResponse>> {
    let client = google_client(&state)?;
    let auth_url = client.auth_url(&auth.user_id)?;

    Ok(Json(GoogleLoginResponse { auth_url }))
}

/// GET /api/auth/google/callback
///
/// Public: the browser arrives here from Google, so the user id travels
/// in `state` rather than a header.
pub async fn callback(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GoogleCallbackQuery>,
) -> Result<Response> {
    if let Some(error) = query.error {
        return Err(ApiError::BadRequest(format!("Google authorization failed: {error}")));
    }

    let code = query
        .code
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;
    let user_id = resolve_user_id(query.state.as_deref(), None)?;

    let client = google_client(&state)?;
    let token = client.exchange_code(&code).await?;

    state.db.touch_user(&user_id).await?;
    state
        .db
        .set_google_token(&user_id, Some(token.to_json()?.as_str()))
        .await?;
    tracing::info!(user_id = %user_id, "Connected Google Calendar");

    match &state.frontend_url {
        Some(frontend) => {
            let target = format!("{}/profile?google=connected", frontend.trim_end_matches('/'));
            Ok(Redirect::to(&target).into_response())
        }
        None => Ok(Json(OkResponse::ok()).into_response()),
    }
}

/// GET /api/auth/google/status
pub async fn status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<GoogleStatusResponse>> {
    let connected = state.db.get_google_token(&auth.user_id).await?.is_some();

    Ok(Json(GoogleStatusResponse {
        configured: state.google.is_some(),
        connected,
    }))
}

/// DELETE /api/auth/google
pub async fn disconnect(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<OkResponse>> {
    state.db.set_google_token(&auth.user_id, None).await?;
    tracing::info!(user_id = %auth.user_id, "Disconnected Google Calendar");

    Ok(Json(OkResponse::ok()))
}
