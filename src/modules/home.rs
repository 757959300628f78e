use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use lectern_http::AppError;
use lectern_kernel::{AppState, InitCtx, Module};
use lectern_store::Filter;

use crate::modules::authors::models::Author;
use crate::modules::books::models::Book;
use crate::modules::genres::models::Genre;
use crate::modules::instances::models::{BookInstance, LoanStatus};

/// Home module: the catalog landing page with collection counts.
pub struct HomeModule;

impl HomeModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for HomeModule {
    fn name(&self) -> &'static str {
        "home"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "home module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router<AppState> {
        Router::new().route("/", get(index))
    }

    fn openapi(&self) -> Option<Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": { "summary": "Catalog home with collection counts", "tags": ["Home"] }
                }
            }
        }))
    }
}

/// All five counts are independent and fetched concurrently.
async fn index(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let store = &state.store;

    let books = store.collection::<Book>();
    let instances = store.collection::<BookInstance>();
    let authors = store.collection::<Author>();
    let genres = store.collection::<Genre>();
    let (book_count, book_instance_count, book_instance_available_count, author_count, genre_count) =
        tokio::try_join!(
            books.count(Filter::all()),
            instances.count(Filter::all()),
            instances.count(Filter::eq("status", LoanStatus::Available)),
            authors.count(Filter::all()),
            genres.count(Filter::all()),
        )?;

    Ok(Json(json!({
        "title": "Local Library Home",
        "data": {
            "book_count": book_count,
            "book_instance_count": book_instance_count,
            "book_instance_available_count": book_instance_available_count,
            "author_count": author_count,
            "genre_count": genre_count,
        },
    })))
}

/// Create a new instance of the home module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(HomeModule::new())
}
