/**
 * DEVICE STORE - Table du dernier relevé par périphérique
 *
 * RÔLE :
 * Ce module conserve le dernier message de log reçu pour chaque adresse
 * Zigbee, et persiste cette table dans un fichier JSON unique.
 *
 * FONCTIONNEMENT :
 * - Écriture : last-write-wins, aucune validation (l'id 0 est stocké)
 * - Lecture : instantané cloné, entrées d'id 0 filtrées à ce moment-là
 * - Persistance : réécriture complète du fichier, au plus une fois par
 *   fenêtre de debounce (les rafales de messages ne saturent pas le disque)
 * - Rechargement au démarrage : les clés JSON (chaînes) redeviennent des ids
 *
 * UTILITÉ DANS ZIGMON :
 * 🎯 Source unique des requêtes /topN et /stats
 * 🎯 Survit aux redémarrages via data.json
 */

use crate::models::{DeviceMap, DeviceRecord};
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Intervalle minimal entre deux réécritures du fichier de persistance
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Erreurs possibles lors des opérations de persistance du store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SharedStore = Arc<DeviceStore>;

/// Table en mémoire des derniers relevés, adossée à un fichier JSON
pub struct DeviceStore {
    /// Chemin du fichier de stockage JSON
    data_file: PathBuf,
    /// Fenêtre de debounce entre deux écritures disque
    flush_interval: Duration,
    /// Derniers relevés, indexés par adresse courte
    devices: Mutex<DeviceMap>,
    /// Instant de la dernière écriture disque effective
    last_flush: Mutex<Option<Instant>>,
}

impl DeviceStore {
    /// Crée un store vide adossé au fichier spécifié (rien n'est lu ni écrit ici)
    pub fn new<P: Into<PathBuf>>(data_file: P) -> Self {
        Self {
            data_file: data_file.into(),
            flush_interval: FLUSH_INTERVAL,
            devices: Mutex::new(DeviceMap::new()),
            last_flush: Mutex::new(None),
        }
    }

    /// Remplace la fenêtre de debounce (tests et réglages)
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Charge la table depuis le fichier JSON.
    /// Fichier absent = table vide, ce n'est pas une erreur.
    /// Retourne le nombre d'entrées restaurées.
    pub fn load(&self) -> Result<usize, StoreError> {
        if !self.data_file.exists() {
            return Ok(0);
        }

        let content = fs::read_to_string(&self.data_file)?;
        let loaded: DeviceMap = serde_json::from_str(&content)?;
        let count = loaded.len();

        *self.devices.lock() = loaded;
        Ok(count)
    }

    /// Écrase l'entrée du périphérique, sans validation.
    /// Un id 0 (coordinateur/broadcast) est stocké comme les autres,
    /// le filtrage se fait en lecture.
    pub fn upsert(&self, record: DeviceRecord) {
        self.devices.lock().insert(record.id, record);
    }

    /// Instantané des périphériques adressés, id 0 exclu
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.devices
            .lock()
            .values()
            .filter(|record| record.id != 0)
            .cloned()
            .collect()
    }

    /// Réécrit le fichier complet si la fenêtre de debounce est écoulée.
    /// Retourne `Ok(true)` si une écriture a eu lieu, `Ok(false)` si elle
    /// a été différée.
    pub fn persist_if_due(&self) -> Result<bool, StoreError> {
        if let Some(last) = *self.last_flush.lock() {
            if last.elapsed() < self.flush_interval {
                return Ok(false);
            }
        }

        // Sérialisation sous verrou, écriture disque après libération
        let json = {
            let devices = self.devices.lock();
            serde_json::to_string_pretty(&*devices)?
        };
        fs::write(&self.data_file, json)?;

        *self.last_flush.lock() = Some(Instant::now());
        debug!("device table flushed to {}", self.data_file.display());
        Ok(true)
    }
}
