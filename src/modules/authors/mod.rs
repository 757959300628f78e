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
use models::{Author, AuthorPayload};

/// Authors module: list/detail/create/update plus the guarded delete
/// (an author with books cannot be removed).
pub struct AuthorsModule;

impl AuthorsModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for AuthorsModule {
    fn name(&self) -> &'static str {
        "authors"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "authors module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/authors", get(author_list))
            .route("/author/create", get(author_create_form).post(author_create))
            .route("/author/{id}", get(author_detail))
            .route(
                "/author/{id}/delete",
                get(author_delete_form).post(author_delete),
            )
            .route(
                "/author/{id}/update",
                get(author_update_form).post(author_update),
            )
    }

    fn openapi(&self) -> Option<Value> {
        Some(json!({
            "paths": {
                "/authors": {
                    "get": { "summary": "List authors", "tags": ["Authors"] }
                },
                "/author/create": {
                    "get": { "summary": "Author create form", "tags": ["Authors"] },
                    "post": { "summary": "Create author", "tags": ["Authors"] }
                },
                "/author/{id}": {
                    "get": { "summary": "Author detail", "tags": ["Authors"] }
                },
                "/author/{id}/delete": {
                    "get": { "summary": "Author delete confirmation", "tags": ["Authors"] },
                    "post": { "summary": "Delete author (guarded)", "tags": ["Authors"] }
                },
                "/author/{id}/update": {
                    "get": { "summary": "Author update form", "tags": ["Authors"] },
                    "post": { "summary": "Update author", "tags": ["Authors"] }
                }
            },
            "components": {
                "schemas": {
                    "Author": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "first_name": { "type": "string" },
                            "family_name": { "type": "string" },
                            "date_of_birth": { "type": "string", "format": "date" },
                            "date_of_death": { "type": "string", "format": "date" }
                        },
                        "required": ["id", "family_name", "date_of_birth"]
                    }
                }
            }
        }))
    }
}

/// Books referencing one author.
fn books_of(author_id: Uuid) -> Query {
    Query::new()
        .filter(Filter::eq("author", author_id))
        .sort("title")
}

fn delete_view(view: &DetailView<Author, Book>) -> Value {
    json!({
        "title": "Delete Author",
        "author": view.entity.summary(),
        "author_books": view.dependents.iter().map(Book::summary_view).collect::<Vec<_>>(),
    })
}

async fn author_list(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let authors = state
        .store
        .collection::<Author>()
        .find(Query::new().sort("family_name"))
        .await?;

    Ok(Json(json!({
        "title": "Author List",
        "author_list": authors.iter().map(Author::summary).collect::<Vec<_>>(),
    })))
}

async fn author_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let view = catalog::fetch_with_dependents::<Author, Book>(&state.store, id, books_of(id))
        .await?
        .ok_or_else(|| AppError::not_found("Author not found"))?;

    Ok(Json(json!({
        "title": "Author Detail",
        "author": view.entity.summary(),
        "author_books": view.dependents.iter().map(Book::summary_view).collect::<Vec<_>>(),
    })))
}

async fn author_create_form() -> Json<Value> {
    Json(json!({ "title": "Create Author" }))
}

async fn author_create(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = FormData::from_pairs(pairs);
    let (payload, errors) = AuthorPayload::from_form(&form);

    if errors.is_empty() {
        if let Some(author) = payload.clone().into_author(Uuid::now_v7()) {
            state.store.collection::<Author>().insert(&author).await?;
            return Ok(Redirect::to(&author.url()).into_response());
        }
    }

    // Redisplay the form with sanitized values and error messages.
    Ok(Json(json!({
        "title": "Create Author",
        "author": payload,
        "errors": errors,
    }))
    .into_response())
}

async fn author_delete_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    match catalog::fetch_with_dependents::<Author, Book>(&state.store, id, books_of(id)).await? {
        None => Ok(Redirect::to("/catalog/authors").into_response()),
        Some(view) => Ok(Json(delete_view(&view)).into_response()),
    }
}

async fn author_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    match catalog::delete_guarded::<Author, Book>(&state.store, id, books_of(id)).await? {
        DeleteOutcome::Blocked(view) => Ok(Json(delete_view(&view)).into_response()),
        DeleteOutcome::Deleted | DeleteOutcome::AlreadyGone => {
            Ok(Redirect::to("/catalog/authors").into_response())
        }
    }
}

async fn author_update_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let author = state
        .store
        .collection::<Author>()
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Author not found"))?;

    Ok(Json(json!({
        "title": "Update Author",
        "author": author.summary(),
    })))
}

async fn author_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = FormData::from_pairs(pairs);
    let (payload, errors) = AuthorPayload::from_form(&form);

    if errors.is_empty() {
        if let Some(author) = payload.clone().into_author(id) {
            let replaced = state.store.collection::<Author>().replace(&author).await?;
            if !replaced {
                return Err(AppError::not_found("Author not found"));
            }
            return Ok(Redirect::to(&author.url()).into_response());
        }
    }

    Ok(Json(json!({
        "title": "Update Author",
        "author": payload,
        "errors": errors,
    }))
    .into_response())
}

/// Create a new instance of the authors module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(AuthorsModule::new())
}
