use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use critica_core::access::{AdminOrReadOnly, Requester, Verb, enforce, enforce_object};
use critica_core::catalog::{CATEGORY_NAME_MAX_LEN, Category, TermPayload};

use crate::AppState;
use crate::errors::{AppError, AppResult};
use crate::handlers::ListQuery;

pub async fn list_categories(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Category>>> {
    enforce(&AdminOrReadOnly, &requester, Verb::Get)?;
    let items = state
        .db
        .catalog()
        .list_categories(query.search.as_deref(), query.page())
        .await?;
    Ok(Json(items))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Json(payload): Json<TermPayload>,
) -> AppResult<(StatusCode, Json<Category>)> {
    enforce(&AdminOrReadOnly, &requester, Verb::Post)?;
    let (name, slug) = payload.validate(CATEGORY_NAME_MAX_LEN)?;
    let category = state.db.catalog().create_category(&name, &slug).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    enforce_object(&AdminOrReadOnly, &requester, Verb::Delete, None)?;
    if !state.db.catalog().delete_category(&slug).await? {
        return Err(AppError::not_found(format!("category {slug:?}")));
    }
    Ok(StatusCode::NO_CONTENT)
}
