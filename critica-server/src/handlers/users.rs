use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
};
use critica_core::access::{AdminOrSuperuser, Requester, Verb, enforce};
use critica_core::user::{CreateUser, UserPatch, UserProfile};

use crate::AppState;
use crate::errors::{AppError, AppResult};
use crate::handlers::{ListQuery, verb_of};

// Admin user management. AdminOrSuperuser has no ownership concept, so
// the collection-level check governs the whole surface.

pub async fn list_users(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<UserProfile>>> {
    enforce(&AdminOrSuperuser, &requester, Verb::Get)?;
    let users = state.db.users().list(query.page()).await?;
    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Json(payload): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    enforce(&AdminOrSuperuser, &requester, Verb::Post)?;
    let new = payload.validate()?;
    let user = state.db.users().create(new).await?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(username): Path<String>,
) -> AppResult<Json<UserProfile>> {
    enforce(&AdminOrSuperuser, &requester, Verb::Get)?;
    let user = state
        .db
        .users()
        .find_by_username(&username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {username:?}")))?;
    Ok(Json(UserProfile::from(&user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(username): Path<String>,
    method: Method,
    Json(patch): Json<UserPatch>,
) -> AppResult<Json<UserProfile>> {
    enforce(&AdminOrSuperuser, &requester, verb_of(&method))?;
    let role = patch.validate()?;
    let user = state
        .db
        .users()
        .update(&username, &patch, role)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {username:?}")))?;
    Ok(Json(UserProfile::from(&user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(username): Path<String>,
) -> AppResult<StatusCode> {
    enforce(&AdminOrSuperuser, &requester, Verb::Delete)?;
    if !state.db.users().delete(&username).await? {
        return Err(AppError::not_found(format!("user {username:?}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

// Self-service profile. Requires authentication only — no policy class.

pub async fn me(
    Extension(requester): Extension<Requester>,
) -> AppResult<Json<UserProfile>> {
    let user = requester.authenticated()?;
    Ok(Json(UserProfile::from(user)))
}

/// Partial self-update. A least-privileged requester submitting any
/// `role` value gets the whole patch ignored — including innocent fields
/// in the same request — and the stored profile back unchanged.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Json(patch): Json<UserPatch>,
) -> AppResult<Json<UserProfile>> {
    let user = requester.authenticated()?;
    // Field validation runs before the role-freeze screen, mirroring the
    // update flow on the admin surface.
    let role = patch.validate()?;

    match patch.screened_for(user.role) {
        None => {
            let current = state
                .db
                .users()
                .find_by_username(&user.username)
                .await?
                .ok_or_else(|| AppError::not_found(format!("user {:?}", user.username)))?;
            Ok(Json(UserProfile::from(&current)))
        }
        Some(patch) => {
            let updated = state
                .db
                .users()
                .update(&user.username, &patch, role)
                .await?
                .ok_or_else(|| AppError::not_found(format!("user {:?}", user.username)))?;
            Ok(Json(UserProfile::from(&updated)))
        }
    }
}
