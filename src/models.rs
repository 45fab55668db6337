use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Format d'horodatage émis par le hub, fraction de seconde incluse
pub const HUB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Adresse réseau courte d'un périphérique Zigbee
pub type DeviceId = u16;

pub type DeviceMap = HashMap<DeviceId, DeviceRecord>;

/// Dernier relevé de routage connu pour un périphérique du mesh.
///
/// Une trame du hub qui porte un champ inconnu ou un type inattendu est
/// rejetée en bloc (`deny_unknown_fields`), jamais corrigée.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeviceRecord {
    pub name: String,
    pub id: DeviceId,
    pub profile_id: u16,
    pub cluster_id: u16,
    pub source_endpoint: u8,
    pub destination_endpoint: u8,
    pub group_id: u16,
    pub sequence: u16,
    pub last_hop_lqi: u8,
    pub last_hop_rssi: i16,
    pub time: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip)]
    date_time: OnceLock<Option<NaiveDateTime>>,
}

impl DeviceRecord {
    /// Adresse courte en hexadécimal, quatre chiffres majuscules (`0x1A2B` -> `1A2B`)
    pub fn id_hex(&self) -> String {
        format!("{:04X}", self.id)
    }

    /// Horodatage du relevé, analysé au premier accès puis mis en cache.
    /// Retourne `None` si le champ `time` ne respecte pas [`HUB_TIME_FORMAT`].
    pub fn date_time(&self) -> Option<NaiveDateTime> {
        *self
            .date_time
            .get_or_init(|| NaiveDateTime::parse_from_str(&self.time, HUB_TIME_FORMAT).ok())
    }
}
