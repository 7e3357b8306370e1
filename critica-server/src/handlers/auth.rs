use axum::{Json, extract::State};
use critica_core::registration::{
    SignupRequest, SignupResponse, TokenRequest, TokenResponse,
};

use crate::AppState;
use crate::errors::AppResult;

/// Two-step signup, step one: validate, create the unconfirmed user and
/// dispatch the confirmation code. A duplicate (username, email) pair
/// still gets a code redispatch but answers 400.
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<Json<SignupResponse>> {
    let response = state.registration.sign_up(payload).await?;
    Ok(Json(response))
}

/// Two-step signup, step two: exchange the confirmation code for a signed
/// access token.
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let response = state.registration.obtain_token(payload).await?;
    Ok(Json(response))
}
