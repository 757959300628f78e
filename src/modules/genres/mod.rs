pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

use lectern_http::AppError;
use lectern_kernel::{AppState, InitCtx, Module};
use lectern_store::{Filter, Query};

use crate::catalog::{self, DeleteOutcome, DetailView};
use crate::forms::FormData;
use crate::modules::books::models::Book;
use models::{Genre, GenrePayload};

/// Genres module. Creation deduplicates by name; deletion is guarded by
/// books still referencing the genre.
pub struct GenresModule;

impl GenresModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for GenresModule {
    fn name(&self) -> &'static str {
        "genres"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "genres module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/genres", get(genre_list))
            .route("/genre/create", get(genre_create_form).post(genre_create))
            .route("/genre/{id}", get(genre_detail))
            .route(
                "/genre/{id}/delete",
                get(genre_delete_form).post(genre_delete),
            )
            .route(
                "/genre/{id}/update",
                get(genre_update_form).post(genre_update),
            )
    }

    fn openapi(&self) -> Option<Value> {
        Some(json!({
            "paths": {
                "/genres": {
                    "get": { "summary": "List genres", "tags": ["Genres"] }
                },
                "/genre/create": {
                    "get": { "summary": "Genre create form", "tags": ["Genres"] },
                    "post": { "summary": "Create genre (deduplicated by name)", "tags": ["Genres"] }
                },
                "/genre/{id}": {
                    "get": { "summary": "Genre detail", "tags": ["Genres"] }
                },
                "/genre/{id}/delete": {
                    "get": { "summary": "Genre delete confirmation", "tags": ["Genres"] },
                    "post": { "summary": "Delete genre (guarded)", "tags": ["Genres"] }
                },
                "/genre/{id}/update": {
                    "get": { "summary": "Genre update form", "tags": ["Genres"] },
                    "post": { "summary": "Update genre", "tags": ["Genres"] }
                }
            },
            "components": {
                "schemas": {
                    "Genre": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "name": { "type": "string" }
                        },
                        "required": ["id", "name"]
                    }
                }
            }
        }))
    }
}

/// Books referencing one genre (membership match on the genre list).
fn books_of(genre_id: Uuid) -> Query {
    Query::new()
        .filter(Filter::eq("genre", genre_id))
        .sort("title")
}

fn delete_view(view: &DetailView<Genre, Book>) -> Value {
    json!({
        "title": "Delete Genre",
        "genre": view.entity.summary(),
        "genre_books": view.dependents.iter().map(Book::summary_view).collect::<Vec<_>>(),
    })
}

async fn genre_list(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let genres = state
        .store
        .collection::<Genre>()
        .find(Query::new().sort("name"))
        .await?;

    Ok(Json(json!({
        "title": "Genre List",
        "genre_list": genres.iter().map(Genre::summary).collect::<Vec<_>>(),
    })))
}

async fn genre_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let view = catalog::fetch_with_dependents::<Genre, Book>(&state.store, id, books_of(id))
        .await?
        .ok_or_else(|| AppError::not_found("Genre not found"))?;

    Ok(Json(json!({
        "title": "Genre Detail",
        "genre": view.entity.summary(),
        "genre_books": view.dependents.iter().map(Book::summary_view).collect::<Vec<_>>(),
    })))
}

async fn genre_create_form() -> Json<Value> {
    Json(json!({ "title": "Create Genre" }))
}

async fn genre_create(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = FormData::from_pairs(pairs);
    let (payload, errors) = GenrePayload::from_form(&form);

    if errors.is_empty() {
        let genres = state.store.collection::<Genre>();

        // Names are effectively unique: reuse an existing genre rather
        // than inserting a duplicate.
        if let Some(existing) = genres
            .find_one(Filter::eq("name", payload.name.as_str()))
            .await?
        {
            return Ok(Redirect::to(&existing.url()).into_response());
        }

        let genre = payload.into_genre(Uuid::now_v7());
        genres.insert(&genre).await?;
        return Ok(Redirect::to(&genre.url()).into_response());
    }

    Ok(Json(json!({
        "title": "Create Genre",
        "genre": payload,
        "errors": errors,
    }))
    .into_response())
}

async fn genre_delete_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    match catalog::fetch_with_dependents::<Genre, Book>(&state.store, id, books_of(id)).await? {
        None => Ok(Redirect::to("/catalog/genres").into_response()),
        Some(view) => Ok(Json(delete_view(&view)).into_response()),
    }
}

async fn genre_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    match catalog::delete_guarded::<Genre, Book>(&state.store, id, books_of(id)).await? {
        DeleteOutcome::Blocked(view) => Ok(Json(delete_view(&view)).into_response()),
        DeleteOutcome::Deleted | DeleteOutcome::AlreadyGone => {
            Ok(Redirect::to("/catalog/genres").into_response())
        }
    }
}

async fn genre_update_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let genre = state
        .store
        .collection::<Genre>()
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Genre not found"))?;

    Ok(Json(json!({
        "title": "Update Genre",
        "genre": genre.summary(),
    })))
}

async fn genre_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = FormData::from_pairs(pairs);
    let (payload, errors) = GenrePayload::from_form(&form);

    if errors.is_empty() {
        let genre = payload.into_genre(id);
        let replaced = state.store.collection::<Genre>().replace(&genre).await?;
        if !replaced {
            return Err(AppError::not_found("Genre not found"));
        }
        return Ok(Redirect::to(&genre.url()).into_response());
    }

    Ok(Json(json!({
        "title": "Update Genre",
        "genre": payload,
        "errors": errors,
    }))
    .into_response())
}

/// Create a new instance of the genres module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(GenresModule::new())
}
