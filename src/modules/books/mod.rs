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
use lectern_store::{DocumentStore, Filter, Query, StoreError};

use crate::catalog::{self, DeleteOutcome, DetailView};
use crate::forms::FormData;
use crate::modules::authors::models::Author;
use crate::modules::genres::models::Genre;
use crate::modules::instances::models::BookInstance;
use models::{Book, BookPayload};

/// Books module. Detail views populate the referenced author and genres;
/// deletion is guarded by existing copies of the book.
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/books", get(book_list))
            .route("/book/create", get(book_create_form).post(book_create))
            .route("/book/{id}", get(book_detail))
            .route("/book/{id}/delete", get(book_delete_form).post(book_delete))
            .route("/book/{id}/update", get(book_update_form).post(book_update))
    }

    fn openapi(&self) -> Option<Value> {
        Some(json!({
            "paths": {
                "/books": {
                    "get": { "summary": "List books with populated authors", "tags": ["Books"] }
                },
                "/book/create": {
                    "get": { "summary": "Book create form", "tags": ["Books"] },
                    "post": { "summary": "Create book", "tags": ["Books"] }
                },
                "/book/{id}": {
                    "get": { "summary": "Book detail with author, genres and copies", "tags": ["Books"] }
                },
                "/book/{id}/delete": {
                    "get": { "summary": "Book delete confirmation", "tags": ["Books"] },
                    "post": { "summary": "Delete book (guarded by copies)", "tags": ["Books"] }
                },
                "/book/{id}/update": {
                    "get": { "summary": "Book update form", "tags": ["Books"] },
                    "post": { "summary": "Update book", "tags": ["Books"] }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "title": { "type": "string" },
                            "summary": { "type": "string" },
                            "isbn": { "type": "string" },
                            "author": { "type": "string", "format": "uuid" },
                            "genre": {
                                "type": "array",
                                "items": { "type": "string", "format": "uuid" }
                            }
                        },
                        "required": ["id", "title", "summary", "isbn", "author", "genre"]
                    }
                }
            }
        }))
    }
}

/// Copies of one book.
fn instances_of(book_id: Uuid) -> Query {
    Query::new().filter(Filter::eq("book", book_id))
}

fn delete_view(view: &DetailView<Book, BookInstance>) -> Value {
    json!({
        "title": "Delete Book",
        "book": view.entity.summary_view(),
        "book_instances": view.dependents.iter().map(BookInstance::summary).collect::<Vec<_>>(),
    })
}

/// Both selects of the book form, fetched concurrently.
async fn form_choices(store: &DocumentStore) -> Result<(Vec<Author>, Vec<Genre>), StoreError> {
    let authors = store.collection::<Author>();
    let genres = store.collection::<Genre>();
    tokio::try_join!(
        authors.find(Query::new().sort("family_name")),
        genres.find(Query::new().sort("name")),
    )
}

/// Form view-model shared by the create/update redisplay paths, with the
/// selected genres checked.
fn form_view(
    title: &str,
    authors: &[Author],
    genres: &[Genre],
    selected_genres: &[Uuid],
    book: Value,
    errors: Value,
) -> Value {
    json!({
        "title": title,
        "authors": authors.iter().map(Author::summary).collect::<Vec<_>>(),
        "genres": catalog::mark_checked(genres, selected_genres),
        "book": book,
        "errors": errors,
    })
}

async fn book_list(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let book_collection = state.store.collection::<Book>();
    let author_collection = state.store.collection::<Author>();
    let (books, authors) = tokio::try_join!(
        book_collection.find(Query::new().sort("title")),
        author_collection.find(Query::new()),
    )?;

    // Populate each book's author reference.
    let authors_by_id: HashMap<Uuid, &Author> =
        authors.iter().map(|author| (author.id, author)).collect();

    let book_list: Vec<Value> = books
        .iter()
        .map(|book| {
            let mut view = book.summary_view();
            view["author"] = authors_by_id
                .get(&book.author)
                .map(|author| author.summary())
                .unwrap_or(Value::Null);
            view
        })
        .collect();

    Ok(Json(json!({
        "title": "Book List",
        "book_list": book_list,
    })))
}

async fn book_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let view =
        catalog::fetch_with_dependents::<Book, BookInstance>(&state.store, id, instances_of(id))
            .await?
            .ok_or_else(|| AppError::not_found("Book not found"))?;
    let book = view.entity;

    // Populate the author and genre references of the found book.
    let author_collection = state.store.collection::<Author>();
    let genre_collection = state.store.collection::<Genre>();
    let (author, genres) = tokio::try_join!(
        author_collection.find_by_id(book.author),
        genre_collection.find(Query::new().sort("name")),
    )?;

    let mut book_view = book.summary_view();
    book_view["author"] = author.map(|a| a.summary()).unwrap_or(Value::Null);
    book_view["genre"] = Value::Array(
        genres
            .iter()
            .filter(|genre| book.genre.contains(&genre.id))
            .map(Genre::summary)
            .collect(),
    );

    Ok(Json(json!({
        "title": "Title",
        "book": book_view,
        "book_instances": view.dependents.iter().map(BookInstance::summary).collect::<Vec<_>>(),
    })))
}

async fn book_create_form(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let (authors, genres) = form_choices(&state.store).await?;

    Ok(Json(form_view(
        "Create Book",
        &authors,
        &genres,
        &[],
        Value::Null,
        json!([]),
    )))
}

async fn book_create(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = FormData::from_pairs(pairs);
    let (payload, errors) = BookPayload::from_form(&form);

    if errors.is_empty() {
        if let Some(book) = payload.clone().into_book(Uuid::now_v7()) {
            state.store.collection::<Book>().insert(&book).await?;
            return Ok(Redirect::to(&book.url()).into_response());
        }
    }

    // Redisplay with both selects reloaded and the chosen genres checked.
    let (authors, genres) = form_choices(&state.store).await?;
    let selected = payload.genre.clone();
    Ok(Json(form_view(
        "Create Book",
        &authors,
        &genres,
        &selected,
        json!(payload),
        json!(errors),
    ))
    .into_response())
}

async fn book_delete_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    match catalog::fetch_with_dependents::<Book, BookInstance>(&state.store, id, instances_of(id))
        .await?
    {
        None => Ok(Redirect::to("/catalog/books").into_response()),
        Some(view) => Ok(Json(delete_view(&view)).into_response()),
    }
}

async fn book_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    match catalog::delete_guarded::<Book, BookInstance>(&state.store, id, instances_of(id)).await? {
        DeleteOutcome::Blocked(view) => Ok(Json(delete_view(&view)).into_response()),
        DeleteOutcome::Deleted | DeleteOutcome::AlreadyGone => {
            Ok(Redirect::to("/catalog/books").into_response())
        }
    }
}

async fn book_update_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let book_collection = state.store.collection::<Book>();
    let author_collection = state.store.collection::<Author>();
    let genre_collection = state.store.collection::<Genre>();
    let (book, authors, genres) = tokio::try_join!(
        book_collection.find_by_id(id),
        author_collection.find(Query::new().sort("family_name")),
        genre_collection.find(Query::new().sort("name")),
    )?;
    let book = book.ok_or_else(|| AppError::not_found("Book not found"))?;

    let selected = book.genre.clone();
    Ok(Json(form_view(
        "Update Book",
        &authors,
        &genres,
        &selected,
        book.summary_view(),
        json!([]),
    )))
}

async fn book_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = FormData::from_pairs(pairs);
    let (payload, errors) = BookPayload::from_form(&form);

    if errors.is_empty() {
        if let Some(book) = payload.clone().into_book(id) {
            let replaced = state.store.collection::<Book>().replace(&book).await?;
            if !replaced {
                return Err(AppError::not_found("Book not found"));
            }
            return Ok(Redirect::to(&book.url()).into_response());
        }
    }

    let (authors, genres) = form_choices(&state.store).await?;
    let selected = payload.genre.clone();
    Ok(Json(form_view(
        "Update Book",
        &authors,
        &genres,
        &selected,
        json!(payload),
        json!(errors),
    ))
    .into_response())
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}
