use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use daily_poem::config::Config;
use daily_poem::db::Database;
use daily_poem::poem::{start_daily_rotation, PoemService};
use daily_poem::routes::{router, AppState};
use daily_poem::writer::{OpenAiWriter, PoemWriter, TemplateWriter};

fn create_writer(config: &Config) -> Arc<dyn PoemWriter> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(api_key) if !api_key.trim().is_empty() => {
            let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| config.poem.model.clone());
            let writer = OpenAiWriter::new(api_key, model, &config.poem.api_base);
            info!("Poems will be written by model {}", writer.model());
            Arc::new(writer)
        }
        _ => {
            info!("OPENAI_API_KEY not set, poems will use the template writer");
            Arc::new(TemplateWriter)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daily_poem=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        "Extracting topics from {} feeds, timezone {}",
        config.feed_urls().len(),
        config.timezone
    );

    // Initialize database
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:daily_poem.db?mode=rwc".to_string());
    let db = Database::new(&database_url).await?;
    db.initialize().await?;
    info!("Database initialized");

    let service = Arc::new(PoemService::new(
        Arc::new(db),
        &config,
        create_writer(&config),
    ));

    // Start background rotation task
    let bg_service = service.clone();
    let check_minutes = config.rotation_check_minutes;
    tokio::spawn(async move {
        start_daily_rotation(bg_service, check_minutes).await;
    });

    let cron_secret = std::env::var("CRON_SECRET")
        .ok()
        .filter(|s| !s.is_empty());
    let state = Arc::new(AppState {
        service,
        cron_secret,
    });
    let app = router(state);

    // Start server
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server starting on http://localhost:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
