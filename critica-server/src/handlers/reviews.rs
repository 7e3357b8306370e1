use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
};
use critica_core::access::{
    AdminModeratorOwnerOrReadOnly, Requester, Verb, enforce, enforce_object,
};
use critica_core::review::{Review, ReviewPayload};
use uuid::Uuid;

use crate::AppState;
use crate::errors::{AppError, AppResult};
use crate::handlers::{ListQuery, verb_of};

/// 404 before any object-level decision when the parent title is missing.
async fn ensure_title(state: &AppState, title_id: Uuid) -> AppResult<()> {
    state
        .db
        .catalog()
        .get_title(title_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found(format!("title {title_id}")))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(title_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Review>>> {
    enforce(&AdminModeratorOwnerOrReadOnly, &requester, Verb::Get)?;
    ensure_title(&state, title_id).await?;
    let reviews = state
        .db
        .reviews()
        .list_reviews(title_id, query.page())
        .await?;
    Ok(Json(reviews))
}

pub async fn create_review(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(title_id): Path<Uuid>,
    Json(payload): Json<ReviewPayload>,
) -> AppResult<(StatusCode, Json<Review>)> {
    enforce(&AdminModeratorOwnerOrReadOnly, &requester, Verb::Post)?;
    let author = requester.authenticated()?;
    ensure_title(&state, title_id).await?;
    let (text, score) = payload.validate_create()?;

    let review = state
        .db
        .reviews()
        .create_review(title_id, author, text, score)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn get_review(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Review>> {
    enforce(&AdminModeratorOwnerOrReadOnly, &requester, Verb::Get)?;
    let review = fetch_review(&state, title_id, review_id).await?;
    enforce_object(
        &AdminModeratorOwnerOrReadOnly,
        &requester,
        Verb::Get,
        Some(review.author_id),
    )?;
    Ok(Json(review))
}

pub async fn update_review(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
    method: Method,
    Json(payload): Json<ReviewPayload>,
) -> AppResult<Json<Review>> {
    let verb = verb_of(&method);
    enforce(&AdminModeratorOwnerOrReadOnly, &requester, verb)?;
    let review = fetch_review(&state, title_id, review_id).await?;
    enforce_object(
        &AdminModeratorOwnerOrReadOnly,
        &requester,
        verb,
        Some(review.author_id),
    )?;
    payload.validate_update()?;

    state
        .db
        .reviews()
        .update_review(review_id, payload.text.as_deref(), payload.score)
        .await?;
    let review = fetch_review(&state, title_id, review_id).await?;
    Ok(Json(review))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    enforce(&AdminModeratorOwnerOrReadOnly, &requester, Verb::Delete)?;
    let review = fetch_review(&state, title_id, review_id).await?;
    enforce_object(
        &AdminModeratorOwnerOrReadOnly,
        &requester,
        Verb::Delete,
        Some(review.author_id),
    )?;

    state.db.reviews().delete_review(review.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_review(
    state: &AppState,
    title_id: Uuid,
    review_id: Uuid,
) -> AppResult<Review> {
    state
        .db
        .reviews()
        .get_review(title_id, review_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("review {review_id}")))
}
