/*!
# Zigmon - Moniteur de qualité de liaison Zigbee

Bibliothèque du moniteur de mesh Zigbee:
- Écoute du flux de logs `zigbeeLogsocket` d'un hub Hubitat
- Table du dernier relevé par périphérique, persistée sur disque
- Classements et statistiques réseau exposés en HTTP
*/

pub mod config;
pub mod http;
pub mod models;
pub mod queries;
pub mod store;
pub mod stream;

pub use config::ListenerConfig;
pub use models::{DeviceMap, DeviceRecord};
pub use store::{DeviceStore, SharedStore};
pub use stream::StreamHandle;
