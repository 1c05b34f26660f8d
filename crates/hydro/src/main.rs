use anyhow::Context;
use hydro::{app, build_app_state, get_config_info, get_log_level, setup_logger, Registry};
use hydro_core::is_directory;
use log::{error, info};
use std::net::SocketAddr;
use tokio::{net::TcpListener, signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = get_config_info();
    setup_logger(get_log_level(&cli)).apply()?;

    let registry = Registry::load(cli.stations_file())
        .inspect_err(|e| error!("{}", e))
        .context("loading station registry")?;
    if !is_directory(cli.data_dir()) {
        info!("stations without a data folder report no data");
    }

    let listener = TcpListener::bind((cli.host(), cli.port()))
        .await
        .with_context(|| format!("binding {}:{}", cli.host(), cli.port()))?;
    let local_addr = listener.local_addr()?;

    info!("hydro api listening on http://{}", local_addr);
    info!("docs at http://{}/docs", local_addr);
    info!(
        "serving {} stations from {}",
        registry.len(),
        cli.data_dir()
    );

    let router = app(build_app_state(
        cli.remote_url(),
        cli.data_dir().to_owned(),
        registry,
    ));

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("hydro api stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("interrupted, shutting down"),
        _ = terminate => info!("terminated, shutting down"),
    }
}
