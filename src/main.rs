mod catalog;
mod forms;
mod modules;
mod seed;

use anyhow::Context;
use lectern_kernel::settings::Settings;
use lectern_kernel::{AppState, InitCtx, ModuleRegistry};
use lectern_store::{DocumentStore, MemoryBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load Lectern settings")?;

    lectern_telemetry::init(&settings.telemetry);

    tracing::info!(env = ?settings.environment, "lectern-app bootstrap starting");

    let store = DocumentStore::new(MemoryBackend::new());

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);

    let ctx = InitCtx {
        settings: &settings,
        store: &store,
    };
    registry.init_all(&ctx).await?;

    if settings.store.seed_demo_data {
        seed::demo_catalog(&store)
            .await
            .with_context(|| "failed to seed demo catalog")?;
        tracing::info!("demo catalog seeded");
    }

    tracing::info!("lectern-app bootstrap complete");

    let state = AppState::new(settings, store);
    lectern_http::start_server(&registry, state).await
}
