use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
};
use critica_core::access::{
    AdminModeratorOwnerOrReadOnly, Requester, Verb, enforce, enforce_object,
};
use critica_core::review::{Comment, CommentPayload};
use uuid::Uuid;

use crate::AppState;
use crate::errors::{AppError, AppResult};
use crate::handlers::{ListQuery, verb_of};

/// 404 unless the review exists under the given title.
async fn ensure_review(
    state: &AppState,
    title_id: Uuid,
    review_id: Uuid,
) -> AppResult<()> {
    state
        .db
        .reviews()
        .get_review(title_id, review_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found(format!("review {review_id}")))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Comment>>> {
    enforce(&AdminModeratorOwnerOrReadOnly, &requester, Verb::Get)?;
    ensure_review(&state, title_id, review_id).await?;
    let comments = state
        .db
        .reviews()
        .list_comments(review_id, query.page())
        .await?;
    Ok(Json(comments))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CommentPayload>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    enforce(&AdminModeratorOwnerOrReadOnly, &requester, Verb::Post)?;
    let author = requester.authenticated()?;
    ensure_review(&state, title_id, review_id).await?;
    let text = payload.validate()?;

    let comment = state
        .db
        .reviews()
        .create_comment(review_id, author, text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path((title_id, review_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<Json<Comment>> {
    enforce(&AdminModeratorOwnerOrReadOnly, &requester, Verb::Get)?;
    ensure_review(&state, title_id, review_id).await?;
    let comment = fetch_comment(&state, review_id, comment_id).await?;
    enforce_object(
        &AdminModeratorOwnerOrReadOnly,
        &requester,
        Verb::Get,
        Some(comment.author_id),
    )?;
    Ok(Json(comment))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path((title_id, review_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
    method: Method,
    Json(payload): Json<CommentPayload>,
) -> AppResult<Json<Comment>> {
    let verb = verb_of(&method);
    enforce(&AdminModeratorOwnerOrReadOnly, &requester, verb)?;
    ensure_review(&state, title_id, review_id).await?;
    let comment = fetch_comment(&state, review_id, comment_id).await?;
    enforce_object(
        &AdminModeratorOwnerOrReadOnly,
        &requester,
        verb,
        Some(comment.author_id),
    )?;
    let text = payload.validate()?;

    state.db.reviews().update_comment(comment.id, text).await?;
    let comment = fetch_comment(&state, review_id, comment_id).await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path((title_id, review_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    enforce(&AdminModeratorOwnerOrReadOnly, &requester, Verb::Delete)?;
    ensure_review(&state, title_id, review_id).await?;
    let comment = fetch_comment(&state, review_id, comment_id).await?;
    enforce_object(
        &AdminModeratorOwnerOrReadOnly,
        &requester,
        Verb::Delete,
        Some(comment.author_id),
    )?;

    state.db.reviews().delete_comment(comment.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_comment(
    state: &AppState,
    review_id: Uuid,
    comment_id: Uuid,
) -> AppResult<Comment> {
    state
        .db
        .reviews()
        .get_comment(review_id, comment_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("comment {comment_id}")))
}
