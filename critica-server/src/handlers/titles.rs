use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
};
use critica_core::access::{AdminOrReadOnly, Requester, Verb, enforce, enforce_object};
use critica_core::catalog::{Title, TitleFilter, TitlePayload};
use critica_core::db::Page;
use critica_core::db::catalog::{TitleChanges, TitleInsert};
use critica_core::error::CoreError;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::errors::{AppError, AppResult};
use crate::handlers::verb_of;

/// List filters plus the shared limit/offset window.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub category: Option<String>,
    pub genre: Option<String>,
    pub name: Option<String>,
    pub year: Option<i32>,
}

impl TitleQuery {
    fn filter(&self) -> TitleFilter {
        TitleFilter {
            category: self.category.clone(),
            genre: self.genre.clone(),
            name: self.name.clone(),
            year: self.year,
        }
    }

    fn page(&self) -> Page {
        Page::clamped(self.limit, self.offset)
    }
}

pub async fn list_titles(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Query(query): Query<TitleQuery>,
) -> AppResult<Json<Vec<Title>>> {
    enforce(&AdminOrReadOnly, &requester, Verb::Get)?;
    let items = state
        .db
        .catalog()
        .list_titles(&query.filter(), query.page())
        .await?;
    Ok(Json(items))
}

pub async fn get_title(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Title>> {
    enforce_object(&AdminOrReadOnly, &requester, Verb::Get, None)?;
    let title = state
        .db
        .catalog()
        .get_title(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("title {id}")))?;
    Ok(Json(title))
}

pub async fn create_title(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Json(payload): Json<TitlePayload>,
) -> AppResult<(StatusCode, Json<Title>)> {
    enforce(&AdminOrReadOnly, &requester, Verb::Post)?;
    payload.validate_create()?;

    // validate_create guarantees the category slug is present.
    let category_slug = payload.category.as_deref().unwrap_or_default();
    let category_id = resolve_category(&state, category_slug).await?;
    let genre_ids = resolve_genres(&state, payload.genre.as_deref()).await?;

    let title = state
        .db
        .catalog()
        .create_title(TitleInsert {
            name: payload.name.unwrap_or_default(),
            year: payload.year.unwrap_or_default(),
            description: payload.description.unwrap_or_default(),
            category_id,
            genre_ids: genre_ids.unwrap_or_default(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(title)))
}

pub async fn update_title(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<Uuid>,
    method: Method,
    Json(payload): Json<TitlePayload>,
) -> AppResult<Json<Title>> {
    enforce_object(&AdminOrReadOnly, &requester, verb_of(&method), None)?;
    payload.validate_update()?;

    let category_id = match payload.category.as_deref() {
        Some(slug) => Some(resolve_category(&state, slug).await?),
        None => None,
    };
    let genre_ids = resolve_genres(&state, payload.genre.as_deref()).await?;

    let title = state
        .db
        .catalog()
        .update_title(
            id,
            TitleChanges {
                name: payload.name,
                year: payload.year,
                description: payload.description,
                category_id,
                genre_ids,
            },
        )
        .await?
        .ok_or_else(|| AppError::not_found(format!("title {id}")))?;
    Ok(Json(title))
}

pub async fn delete_title(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    enforce_object(&AdminOrReadOnly, &requester, Verb::Delete, None)?;
    if !state.db.catalog().delete_title(id).await? {
        return Err(AppError::not_found(format!("title {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn resolve_category(state: &AppState, slug: &str) -> AppResult<Uuid> {
    let category = state
        .db
        .catalog()
        .find_category(slug)
        .await?
        .ok_or_else(|| CoreError::validation(format!("unknown category: {slug:?}")))?;
    Ok(category.id)
}

async fn resolve_genres(
    state: &AppState,
    slugs: Option<&[String]>,
) -> AppResult<Option<Vec<Uuid>>> {
    let Some(slugs) = slugs else {
        return Ok(None);
    };
    let mut ids = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let genre = state
            .db
            .catalog()
            .find_genre(slug)
            .await?
            .ok_or_else(|| CoreError::validation(format!("unknown genre: {slug:?}")))?;
        ids.push(genre.id);
    }
    Ok(Some(ids))
}
