/**
 * STREAM LISTENER - Écoute du flux de logs Zigbee du hub
 *
 * RÔLE :
 * Maintient une connexion WebSocket vers le `zigbeeLogsocket` du hub,
 * décode chaque trame en DeviceRecord et alimente le store.
 *
 * FONCTIONNEMENT :
 * - Connexion perdue ou refusée : nouvelle tentative après un délai fixe,
 *   indéfiniment (le hub redémarre plus souvent que le moniteur)
 * - Trame invalide : la session entière est abandonnée puis reconstruite,
 *   la trame n'est jamais ignorée silencieusement
 * - Arrêt : le signal gagne sur tout, y compris sur l'attente de reconnexion
 */

use crate::models::DeviceRecord;
use crate::store::SharedStore;
use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Délai fixe entre deux tentatives de connexion au hub
pub const RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Poignée de contrôle de la tâche d'écoute
pub struct StreamHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Demande l'arrêt de la boucle d'écoute (idempotent)
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Demande l'arrêt puis attend la fin effective de la tâche
    pub async fn shutdown(self) {
        self.signal_shutdown();
        let _ = self.task.await;
    }
}

/// Lance la tâche d'écoute du flux de logs et retourne sa poignée
pub fn spawn_stream_listener(
    ws_url: String,
    store: SharedStore,
    reconnect_delay: Duration,
) -> StreamHandle {
    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run_listener(ws_url, store, reconnect_delay, shutdown_rx));
    StreamHandle { shutdown, task }
}

async fn run_listener(
    ws_url: String,
    store: SharedStore,
    reconnect_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        match stream_session(&ws_url, &store, &mut shutdown).await {
            // Ok = arrêt demandé pendant la session
            Ok(()) => break,
            Err(e) => warn!(
                "flux hub interrompu: {e:#}; reconnexion dans {}s",
                reconnect_delay.as_secs()
            ),
        }
        // L'arrêt interrompt aussi l'attente de reconnexion
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {}
            _ = shutdown.changed() => break,
        }
    }
    info!("hub stream listener stopped");
}

/// Une session = une connexion WebSocket. Ne retourne `Ok(())` que sur
/// demande d'arrêt ; toute autre sortie est une erreur et l'appelant
/// retentera la connexion.
async fn stream_session(
    ws_url: &str,
    store: &SharedStore,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<()> {
    let (mut socket, _) = connect_async(ws_url)
        .await
        .context("connexion au log socket du hub")?;
    info!("connected to {ws_url}");

    loop {
        tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            frame = socket.next() => {
                let message = match frame {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => return Err(e).context("lecture du log socket"),
                    None => return Err(anyhow!("le hub a fermé le log socket")),
                };
                match message {
                    Message::Text(text) => ingest_frame(store, text.as_bytes())?,
                    Message::Binary(bytes) => ingest_frame(store, &bytes)?,
                    Message::Close(_) => return Err(anyhow!("le hub a fermé le log socket")),
                    // Ping/pong gérés par tungstenite
                    _ => {}
                }
            }
        }
    }
}

/// Décode une trame et met le store à jour. Une trame malformée fait
/// échouer la session entière, connexion comprise.
fn ingest_frame(store: &SharedStore, payload: &[u8]) -> Result<()> {
    let record: DeviceRecord = serde_json::from_slice(payload).with_context(|| {
        format!("trame invalide: {}", String::from_utf8_lossy(payload))
    })?;
    debug!("log {} ({}) lqi={}", record.id_hex(), record.name, record.last_hop_lqi);

    store.upsert(record);
    if let Err(e) = store.persist_if_due() {
        warn!("échec de persistance de la table: {e}");
    }
    Ok(())
}
