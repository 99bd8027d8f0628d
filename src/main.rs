use std::sync::Arc;

use anyhow::Context;

use northblog::{
    app,
    auth::{clock::SystemClock, repo::PgUserStore},
    config::AppConfig,
    db, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(&config);
    tracing::info!(env = %config.env, "starting northblog auth backend");
    tracing::debug!("debug messages are enabled");

    let db = db::connect(&config.database).await?;
    db::migrate(&db).await?;
    tracing::info!("postgres connection done");

    let config = Arc::new(config);
    let state = AppState::new(
        config.clone(),
        Arc::new(PgUserStore::new(db.clone())),
        Arc::new(SystemClock),
    )
    .context("init auth core")?;

    let app = app::build_app(state)?;
    let served = app::serve(app, &config.http).await;

    db.close().await;
    tracing::info!("app stopped");
    served
}

fn init_tracing(config: &AppConfig) {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "northblog=debug,axum=info,tower_http=info".to_string());
    let json_logs = match std::env::var("LOG_FORMAT") {
        Ok(v) => v == "json",
        Err(_) => !config.is_local(),
    };

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}
