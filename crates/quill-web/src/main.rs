use std::net::SocketAddr;
use std::sync::Arc;

use quill_core::MemoryStore;
use quill_web::{router, spawn_maintenance, AppState, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill_web=debug,quill_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load()?;
    let bind_addr = config.bind_addr;
    let tls_config = config.tls.clone();

    let state = AppState::new(config, Arc::new(MemoryStore::new()));
    tracing::info!(
        "Rate limits: login {}/{}s, register {}/{}s, reset {}/{}s",
        state.config.rate_limit.login.limit,
        state.config.rate_limit.login.window_secs,
        state.config.rate_limit.register.limit,
        state.config.rate_limit.register.window_secs,
        state.config.rate_limit.reset.limit,
        state.config.rate_limit.reset.window_secs,
    );

    let _maintenance = spawn_maintenance(&state);
    let app = router(state);

    if let (Some(cert), Some(key)) = (&tls_config.cert_path, &tls_config.key_path) {
        use axum_server::tls_rustls::RustlsConfig;
        let rustls_config = RustlsConfig::from_pem_file(cert, key).await?;
        tracing::info!("quill-web listening on https://{}", bind_addr);
        axum_server::bind_rustls(bind_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!("quill-web listening on http://{}", bind_addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}
