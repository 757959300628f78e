pub mod models;

use std::collections::HashMap;
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
use lectern_store::Query;

use crate::forms::FormData;
use crate::modules::books::models::Book;
use models::{BookInstance, InstancePayload};

/// Book-instances module: the physical copies. Nothing references an
/// instance, so its delete flow is unguarded.
pub struct InstancesModule;

impl InstancesModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for InstancesModule {
    fn name(&self) -> &'static str {
        "bookinstances"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "bookinstances module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/bookinstances", get(instance_list))
            .route(
                "/bookinstance/create",
                get(instance_create_form).post(instance_create),
            )
            .route("/bookinstance/{id}", get(instance_detail))
            .route(
                "/bookinstance/{id}/delete",
                get(instance_delete_form).post(instance_delete),
            )
            .route(
                "/bookinstance/{id}/update",
                get(instance_update_form).post(instance_update),
            )
    }

    fn openapi(&self) -> Option<Value> {
        Some(json!({
            "paths": {
                "/bookinstances": {
                    "get": { "summary": "List copies with populated books", "tags": ["BookInstances"] }
                },
                "/bookinstance/create": {
                    "get": { "summary": "Copy create form", "tags": ["BookInstances"] },
                    "post": { "summary": "Create copy", "tags": ["BookInstances"] }
                },
                "/bookinstance/{id}": {
                    "get": { "summary": "Copy detail", "tags": ["BookInstances"] }
                },
                "/bookinstance/{id}/delete": {
                    "get": { "summary": "Copy delete confirmation", "tags": ["BookInstances"] },
                    "post": { "summary": "Delete copy", "tags": ["BookInstances"] }
                },
                "/bookinstance/{id}/update": {
                    "get": { "summary": "Copy update form", "tags": ["BookInstances"] },
                    "post": { "summary": "Update copy", "tags": ["BookInstances"] }
                }
            },
            "components": {
                "schemas": {
                    "BookInstance": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "book": { "type": "string", "format": "uuid" },
                            "imprint": { "type": "string" },
                            "status": {
                                "type": "string",
                                "enum": ["Available", "Maintenance", "Loaned", "Reserved"]
                            },
                            "due_back": { "type": "string", "format": "date" }
                        },
                        "required": ["id", "book", "imprint", "status"]
                    }
                }
            }
        }))
    }
}

/// Book titles for the instance form select.
async fn book_choices(state: &AppState) -> Result<Vec<Book>, AppError> {
    Ok(state
        .store
        .collection::<Book>()
        .find(Query::new().sort("title"))
        .await?)
}

async fn instance_list(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let instance_collection = state.store.collection::<BookInstance>();
    let book_collection = state.store.collection::<Book>();
    let (instances, books) = tokio::try_join!(
        instance_collection.find(Query::new().sort("imprint")),
        book_collection.find(Query::new()),
    )?;

    // Populate each instance's book reference.
    let books_by_id: HashMap<Uuid, &Book> = books.iter().map(|book| (book.id, book)).collect();

    let instance_list: Vec<Value> = instances
        .iter()
        .map(|instance| {
            let mut view = instance.summary();
            view["book"] = books_by_id
                .get(&instance.book)
                .map(|book| book.summary_view())
                .unwrap_or(Value::Null);
            view
        })
        .collect();

    Ok(Json(json!({
        "title": "Book Instance List",
        "bookinstance_list": instance_list,
    })))
}

async fn instance_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let instance = state
        .store
        .collection::<BookInstance>()
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Book copy not found"))?;

    let book = state
        .store
        .collection::<Book>()
        .find_by_id(instance.book)
        .await?;

    let mut view = instance.summary();
    view["book"] = book.map(|b| b.summary_view()).unwrap_or(Value::Null);

    Ok(Json(json!({
        "title": "Book:",
        "bookinstance": view,
    })))
}

async fn instance_create_form(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let books = book_choices(&state).await?;

    Ok(Json(json!({
        "title": "Create BookInstance",
        "book_list": books.iter().map(Book::summary_view).collect::<Vec<_>>(),
    })))
}

async fn instance_create(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = FormData::from_pairs(pairs);
    let (payload, errors) = InstancePayload::from_form(&form);

    if errors.is_empty() {
        if let Some(instance) = payload.clone().into_instance(Uuid::now_v7()) {
            state
                .store
                .collection::<BookInstance>()
                .insert(&instance)
                .await?;
            return Ok(Redirect::to(&instance.url()).into_response());
        }
    }

    let books = book_choices(&state).await?;
    Ok(Json(json!({
        "title": "Create BookInstance",
        "book_list": books.iter().map(Book::summary_view).collect::<Vec<_>>(),
        "selected_book": payload.book,
        "bookinstance": payload,
        "errors": errors,
    }))
    .into_response())
}

async fn instance_delete_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    match state
        .store
        .collection::<BookInstance>()
        .find_by_id(id)
        .await?
    {
        None => Ok(Redirect::to("/catalog/bookinstances").into_response()),
        Some(instance) => Ok(Json(json!({
            "title": "Delete BookInstance",
            "bookinstance": instance.summary(),
        }))
        .into_response()),
    }
}

async fn instance_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    // Unguarded: nothing references a copy. Already-gone is success.
    state.store.collection::<BookInstance>().delete(id).await?;
    Ok(Redirect::to("/catalog/bookinstances").into_response())
}

async fn instance_update_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let instance_collection = state.store.collection::<BookInstance>();
    let book_collection = state.store.collection::<Book>();
    let (instance, books) = tokio::try_join!(
        instance_collection.find_by_id(id),
        book_collection.find(Query::new().sort("title")),
    )?;
    let instance = instance.ok_or_else(|| AppError::not_found("Book copy not found"))?;

    Ok(Json(json!({
        "title": "Update BookInstance",
        "book_list": books.iter().map(Book::summary_view).collect::<Vec<_>>(),
        "selected_book": instance.book,
        "bookinstance": instance.summary(),
    })))
}

async fn instance_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = FormData::from_pairs(pairs);
    let (payload, errors) = InstancePayload::from_form(&form);

    if errors.is_empty() {
        if let Some(instance) = payload.clone().into_instance(id) {
            let replaced = state
                .store
                .collection::<BookInstance>()
                .replace(&instance)
                .await?;
            if !replaced {
                return Err(AppError::not_found("Book copy not found"));
            }
            return Ok(Redirect::to(&instance.url()).into_response());
        }
    }

    let books = book_choices(&state).await?;
    Ok(Json(json!({
        "title": "Update BookInstance",
        "book_list": books.iter().map(Book::summary_view).collect::<Vec<_>>(),
        "selected_book": payload.book,
        "bookinstance": payload,
        "errors": errors,
    }))
    .into_response())
}

/// Create a new instance of the bookinstances module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(InstancesModule::new())
}
