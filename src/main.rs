use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use revive::auth::JwtKeys;
use revive::config::Config;
use revive::photos::{CloudinaryHost, LocalPhotoHost, PhotoHost};
use revive::{AppState, build_app, cli, db, scheduler, store};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, shutting down gracefully");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,revive=debug,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let pool = db::init_pool(&config)
        .await
        .context("failed to open database")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => {}
        [command, username, password] if command == "create-admin" => {
            cli::create_admin(&pool, username, password, config.bcrypt_cost)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            pool.close().await;
            return Ok(());
        }
        _ => anyhow::bail!("usage: revive [create-admin <username> <password>]"),
    }

    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        cli::seed_admin(&pool, username, password, config.bcrypt_cost)
            .await
            .context("failed to seed admin")?;
    }

    let photos: Arc<dyn PhotoHost> = match &config.cloudinary {
        Some(c) => {
            tracing::info!(cloud = %c.cloud_name, "photos hosted on cloudinary");
            Arc::new(CloudinaryHost::new(
                c.cloud_name.clone(),
                c.api_key.clone(),
                c.api_secret.clone(),
            ))
        }
        None => {
            tracing::info!(dir = %config.upload_dir, "photos stored locally");
            Arc::new(LocalPhotoHost::new(&config.upload_dir, &config.public_base_url))
        }
    };

    let state = AppState::new(pool.clone(), JwtKeys::new(&config.jwt_secret), photos);

    if let Err(e) = state.store.auto_expire(store::today()).await {
        tracing::warn!(error = %e, "startup expiry sweep failed");
    }
    let sweeper = scheduler::start(state.store.clone(), config.expiry_sweep_interval);

    let app = build_app(state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    pool.close().await;
    tracing::info!("database pool closed");

    Ok(())
}
