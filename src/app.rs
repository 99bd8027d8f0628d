use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{routing::get, Router};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    auth,
    config::{HttpConfig, LimiterConfig},
    openapi,
    state::AppState,
};

pub fn build_app(state: AppState) -> anyhow::Result<Router> {
    let config = state.config.clone();

    let api = Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state);

    let api = if config.http.swagger_enabled {
        info!(path = openapi::SWAGGER_UI_PATH, "swagger enabled");
        api.merge(openapi::swagger_ui())
    } else {
        api
    };

    let api = if config.limiter.enabled {
        let limiter = &config.limiter;
        let governor = Arc::new(
            GovernorConfigBuilder::default()
                .per_millisecond(replenish_interval_ms(limiter))
                .burst_size(limiter.burst)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .context("invalid rate limiter settings")?,
        );

        // drop buckets of clients that went quiet
        let buckets = governor.limiter().clone();
        let period = Duration::from_secs(limiter.cleanup_secs.max(1));
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            loop {
                tick.tick().await;
                buckets.retain_recent();
            }
        });

        api.layer(GovernorLayer { config: governor })
    } else {
        api
    };

    Ok(api
        .layer(TimeoutLayer::new(Duration::from_secs(config.http.timeout_secs)))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = res.status();
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        ))
}

/// One request token is replenished every returned milliseconds.
fn replenish_interval_ms(cfg: &LimiterConfig) -> u64 {
    (1000 / cfg.rps.max(1)).max(1)
}

pub async fn serve(app: Router, cfg: &HttpConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;

    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining connections");
}
