/*
 * Responsibility
 * - tracing / panic hook 初期化
 * - 依存生成 (store → repo → service) → Router 組み立て
 * - Middleware の適用 (auth → http → CORS)
 * - axum::serve() で起動、SIGINT/SIGTERM で graceful shutdown
 */
use std::{panic, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::cli::LogFormat;
use crate::config::{Config, LogConfig};
use crate::middleware;
use crate::repos::{AccountRepo, Store};
use crate::services::auth::build_auth_config;
use crate::services::otp::OtpService;
use crate::state::AppState;

fn init_tracing(log: &LogConfig) {
    // RUST_LOG wins over --log-level. Ex:
    // RUST_LOG=info,otpd=debug,tower_http=debug otpd start
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Console => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn init_panic_hook() {
    let default_hook = panic::take_hook();

    // Report through tracing, then unwind so CatchPanicLayer can answer with a 500.
    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");
        default_hook(info);
    }))
}

pub async fn run(config: Config) -> Result<()> {
    init_tracing(&config.log);
    init_panic_hook();

    tracing::info!(
        "starting otpd in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let app = build_app(&config).await?;
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("otpd stopped");
    Ok(())
}

pub async fn build_app(config: &Config) -> Result<Router> {
    let state = build_state(config).await?;
    build_router(state, config)
}

async fn build_state(config: &Config) -> Result<AppState> {
    let store = Store::open(&config.data_path)
        .await
        .context("failed to open account store")?;
    let accounts = Arc::new(AccountRepo::new(&store));
    let otp = Arc::new(OtpService::new(accounts, config.otp_issuer.clone()));

    Ok(AppState::new(otp))
}

fn build_router(state: AppState, config: &Config) -> Result<Router> {
    let mut router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes());

    if config.auth.enabled {
        let auth = build_auth_config(&config.auth).context("invalid auth configuration")?;
        tracing::info!(?auth, "request authentication enabled");
        router = middleware::auth::apply(router, auth);
    } else {
        tracing::warn!("request authentication disabled");
    }

    let router = middleware::http::apply(router.with_state(state));
    Ok(middleware::cors::apply(router, config))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}
