//! MediConnect application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Open the SQLite doctor directory
//! 3. Wire the Gemini text and image clients when a key is available
//! 4. Build the avatar resolver and the chat service
//! 5. Start the session sweeper and the axum HTTP server

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use mediconnect_api::{start_server, AppState};
use mediconnect_avatar::{portrait_constraints, AvatarResolver};
use mediconnect_chat::{ChatService, InMemorySessionStore, QueryInterpreter, ResultRenderer};
use mediconnect_core::MediConnectConfig;
use mediconnect_llm::{GeminiClient, ImagenClient, TextGenerator};
use mediconnect_storage::{Database, DoctorRepository, DoctorStore};

use cli::{expand_home, CliArgs};

/// How often idle chat sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // RUST_LOG wins over every configured level. Until the config file is
    // read, the CLI level (or info) applies.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let level_from_env = env_filter.is_some();
    let (filter, filter_handle) = reload::Layer::new(env_filter.unwrap_or_else(|| {
        EnvFilter::new(args.resolve_log_level().as_deref().unwrap_or("info"))
    }));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    tracing::info!("Starting MediConnect v{}", env!("CARGO_PKG_VERSION"));

    let config_file = args.resolve_config_path();
    let mut config = MediConnectConfig::load_or_default(&config_file);

    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(dir) = args.resolve_static_dir() {
        config.general.static_dir = dir;
    }
    config.general.port = args.resolve_port(config.general.port);

    if !level_from_env {
        if let Err(e) = filter_handle.reload(EnvFilter::new(&config.general.log_level)) {
            tracing::warn!(error = %e, "Failed to apply configured log level");
        }
    }

    // Storage.
    let data_dir = expand_home(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join("mediconnect.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    let store: Arc<dyn DoctorStore> = Arc::new(DoctorRepository::new(db));

    // Model clients.
    let api_key = config.llm.resolve_api_key();
    let text: Option<Arc<dyn TextGenerator>> = match (&api_key, config.llm.enabled) {
        (Some(key), true) => {
            let client = GeminiClient::new(key.clone(), &config.llm)?;
            tracing::info!(model = client.model(), "Text model configured");
            let client: Arc<dyn TextGenerator> = Arc::new(client);
            Some(client)
        }
        (None, true) => {
            tracing::warn!("No Gemini API key found, the chatbot will report itself unavailable");
            None
        }
        (_, false) => {
            tracing::info!("Text model disabled in config");
            None
        }
    };

    let mut resolver = AvatarResolver::new(config.avatar.clone())
        .with_ai_timeout(Duration::from_secs(config.avatar.ai_timeout_secs.max(1)));
    if let Some(text) = &text {
        resolver = resolver.with_text_generator(Arc::clone(text));
    }
    if let (Some(key), true) = (&api_key, config.image.enabled) {
        let imagen = ImagenClient::new(key.clone(), &config.llm, &config.image)?;
        resolver = resolver.with_image_generator(
            Arc::new(imagen),
            portrait_constraints(&config.image.aspect_ratio),
            Duration::from_secs(config.image.timeout_secs.max(1)),
        );
        tracing::info!(model = %config.image.model, "Image model configured");
    }
    let avatars = Arc::new(resolver);

    // Chat.
    let sessions = Arc::new(InMemorySessionStore::new());
    let interpreter = text.map(|generator| {
        QueryInterpreter::new(generator, Duration::from_secs(config.llm.timeout_secs.max(1)))
    });
    let chat = Arc::new(ChatService::new(
        interpreter,
        Arc::clone(&store),
        sessions.clone(),
        ResultRenderer::new(Arc::clone(&avatars)),
        config.chat.clone(),
    ));

    // === Background tasks ===

    let max_idle = chrono::Duration::minutes(i64::from(config.chat.session_timeout_minutes));
    let sweeper_sessions = Arc::clone(&sessions);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = sweeper_sessions.prune_idle(max_idle, chrono::Utc::now()) {
                tracing::warn!(error = %e, "Session sweep failed");
            }
        }
    });

    // === HTTP server ===

    let state = AppState::new(config.clone(), store, chat, avatars);
    if let Err(e) = start_server(&config, state).await {
        tracing::error!(port = config.general.port, error = %e, "Server stopped");
        tracing::error!("Try: mediconnect --port {}", config.general.port.saturating_add(1));
        return Err(e.into());
    }

    Ok(())
}
