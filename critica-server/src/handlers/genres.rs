use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use critica_core::access::{AdminOrReadOnly, Requester, Verb, enforce, enforce_object};
use critica_core::catalog::{GENRE_NAME_MAX_LEN, Genre, TermPayload};

use crate::AppState;
use crate::errors::{AppError, AppResult};
use crate::handlers::ListQuery;

pub async fn list_genres(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Genre>>> {
    enforce(&AdminOrReadOnly, &requester, Verb::Get)?;
    let items = state
        .db
        .catalog()
        .list_genres(query.search.as_deref(), query.page())
        .await?;
    Ok(Json(items))
}

pub async fn create_genre(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Json(payload): Json<TermPayload>,
) -> AppResult<(StatusCode, Json<Genre>)> {
    enforce(&AdminOrReadOnly, &requester, Verb::Post)?;
    let (name, slug) = payload.validate(GENRE_NAME_MAX_LEN)?;
    let genre = state.db.catalog().create_genre(&name, &slug).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

pub async fn delete_genre(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    enforce_object(&AdminOrReadOnly, &requester, Verb::Delete, None)?;
    if !state.db.catalog().delete_genre(&slug).await? {
        return Err(AppError::not_found(format!("genre {slug:?}")));
    }
    Ok(StatusCode::NO_CONTENT)
}
