//! Main Entrypoint for the Sakhi API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the user store (Postgres or in-memory).
//! 3. Initializing the language model and alert clients.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use sakhi_api::{
    config::{Config, StoreBackend},
    db::Db,
    router::create_router,
    state::AppState,
};
use sakhi_core::{
    alert::{AlertSink, IftttAlertSink, LogAlertSink},
    command::CommandSignal,
    dispatch::{DispatchRouter, check_persona_template},
    oracle::{OpenAICompatibleOracle, TextOracle},
    store::{InMemoryUserStore, UserStore},
};
use sqlx::postgres::PgPoolOptions;
use std::{collections::HashMap, fs, net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// A helper function to load prompt overrides from a directory.
fn load_prompts(prompts_path: &std::path::Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    for entry in fs::read_dir(prompts_path)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content.trim_end().to_string());
        }
    }
    Ok(prompts)
}

/// Connects to Postgres lazily. An unreachable database is logged and the
/// service keeps running; requests that touch the store will fail until it
/// comes back.
async fn init_postgres(database_url: &str) -> anyhow::Result<Arc<dyn UserStore>> {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(database_url)
        .context("Invalid DATABASE_URL")?;
    let db = Db::new(pool);
    match db.run_migrations().await {
        Ok(()) => info!("Database connection established and migrations are up-to-date."),
        Err(e) => error!(error = ?e, "Database unavailable at startup; continuing in degraded mode"),
    }
    Ok(Arc::new(db))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize User Store ---
    let users: Arc<dyn UserStore> = match (&config.store_backend, &config.database_url) {
        (StoreBackend::Postgres, Some(url)) => init_postgres(url).await?,
        (StoreBackend::Postgres, None) => anyhow::bail!("DATABASE_URL is required for postgres"),
        (StoreBackend::Memory, _) => {
            warn!("Using in-memory user store; registrations are lost on restart.");
            Arc::new(InMemoryUserStore::new())
        }
    };

    // --- 4. Initialize Shared Services ---
    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.model_api_key)
        .with_api_base(config.provider.api_base());
    let oracle: Arc<dyn TextOracle> = Arc::new(OpenAICompatibleOracle::new(
        openai_config,
        config.chat_model.clone(),
        config.oracle_timeout,
    ));

    let alerts: Arc<dyn AlertSink> = match &config.ifttt_webhook_key {
        Some(key) => {
            let sink = IftttAlertSink::new(
                config.sos_event_name.clone(),
                key.clone(),
                WEBHOOK_TIMEOUT,
            )?;
            Arc::new(match &config.ifttt_base_url {
                Some(base_url) => sink.with_base_url(base_url.clone()),
                None => sink,
            })
        }
        None => {
            warn!("IFTTT_WEBHOOK_KEY not set; SOS alerts will only be logged.");
            Arc::new(LogAlertSink)
        }
    };

    let persona = match load_prompts(&config.prompts_path) {
        Ok(mut prompts) => prompts.remove("persona").filter(|persona| {
            match check_persona_template(persona) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Ignoring persona.md; using built-in persona");
                    false
                }
            }
        }),
        Err(e) => {
            warn!(
                path = %config.prompts_path.display(),
                error = %e,
                "Could not read prompts directory; using built-in persona"
            );
            None
        }
    };

    let commands = Arc::new(CommandSignal::new());
    let mut dispatcher = DispatchRouter::new(commands.clone(), users.clone(), oracle, alerts);
    if let Some(persona) = persona {
        info!("Using persona prompt from {}", config.prompts_path.display());
        dispatcher = dispatcher.with_persona_template(persona)?;
    }

    let app_state = Arc::new(AppState {
        users,
        commands,
        dispatcher: Arc::new(dispatcher),
    });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // --- 6. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
