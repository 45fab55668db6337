/**
 * ZIGMON - Point d'entrée du moniteur de mesh Zigbee
 *
 * RÔLE : Assemblage des modules : config, store, écoute du flux, API HTTP.
 * Le store et la poignée d'écoute sont construits ici puis injectés,
 * aucun état global de processus.
 *
 * ARRÊT : Ctrl-C arrête le serveur HTTP puis la tâche d'écoute. Aucune
 * écriture disque forcée à la sortie, la fenêtre de debounce assume la
 * perte des derniers relevés.
 */

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use zigmon::http::{build_router, AppState};
use zigmon::store::DeviceStore;
use zigmon::stream::{spawn_stream_listener, RECONNECT_DELAY};
use zigmon::ListenerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Sans configuration valide il n'y a rien à surveiller
    let config = ListenerConfig::load().await?;
    let level: Level = config
        .log_level
        .parse()
        .with_context(|| format!("invalid log_level '{}'", config.log_level))?;
    tracing_subscriber::fmt().with_max_level(level).init();

    let ws_url = config.ws_endpoint()?;
    info!("hub zigbee log socket: {ws_url}");

    let store = Arc::new(DeviceStore::new(&config.data_file));
    match store.load() {
        Ok(count) => info!("{count} device records restored from {}", config.data_file.display()),
        // Fichier illisible = table vide, jamais bloquant au démarrage
        Err(e) => warn!("could not restore {}: {e}", config.data_file.display()),
    }

    let listener_handle = spawn_stream_listener(ws_url, store.clone(), RECONNECT_DELAY);

    let app = build_router(AppState { store });
    let addr = SocketAddr::from((config.listen_addr, config.listen_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("http server")?;

    listener_handle.shutdown().await;
    info!("zigmon stopped");
    Ok(())
}
