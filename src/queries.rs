/**
 * QUERIES - Classements et statistiques du mesh
 *
 * RÔLE :
 * Calculs purs sur un instantané de la table des périphériques : aucun
 * verrou, aucune horloge implicite (l'instant de référence est un paramètre).
 *
 * FONCTIONNEMENT :
 * - Classement par qualité de lien croissante : les liens les plus faibles
 *   d'abord, LQI puis RSSI en départage, ordre d'entrée conservé à égalité
 * - Statistiques : min/médiane/max sur LQI et RSSI, comptages de fraîcheur
 *   (24 h / 7 jours) et horodatage du relevé le plus récent
 */

use crate::models::DeviceRecord;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::cmp::Ordering;

/// Format d'affichage du relevé le plus récent (précision à la seconde)
const LAST_SEEN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ordre composite des liens : LQI croissant, RSSI croissant en départage
pub fn compare_link_quality(a: &DeviceRecord, b: &DeviceRecord) -> Ordering {
    a.last_hop_lqi
        .cmp(&b.last_hop_lqi)
        .then_with(|| a.last_hop_rssi.cmp(&b.last_hop_rssi))
}

/// Classe les périphériques du lien le plus faible au plus fort et garde
/// les `n` premiers. `n <= 0` retourne le classement complet.
/// Le tri est stable : à LQI et RSSI égaux, l'ordre d'entrée est conservé.
pub fn top_n(mut records: Vec<DeviceRecord>, n: i64) -> Vec<DeviceRecord> {
    records.sort_by(compare_link_quality);
    if n > 0 {
        records.truncate(n as usize);
    }
    records
}

/// Résumé min/médiane/max d'une métrique de lien
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricSummary {
    pub min: i64,
    pub median: i64,
    pub max: i64,
}

/// Statistiques globales du mesh à un instant donné
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub lqi: MetricSummary,
    pub rssi: MetricSummary,
    pub devices_total: usize,
    pub devices_last_24h: usize,
    pub devices_last_7d: usize,
    /// Horodatage du relevé le plus récent, `None` si aucun n'est datable
    pub last_seen: Option<String>,
}

/// Calcule les statistiques du mesh par rapport à l'instant `now`.
/// Retourne `None` sur une table vide. Les relevés à l'horodatage
/// inexploitable comptent dans le total mais pas dans la fraîcheur.
pub fn network_stats(records: &[DeviceRecord], now: NaiveDateTime) -> Option<NetworkStats> {
    if records.is_empty() {
        return None;
    }

    let lqi = min_med_max(records.iter().map(|r| i64::from(r.last_hop_lqi)).collect());
    let rssi = min_med_max(records.iter().map(|r| i64::from(r.last_hop_rssi)).collect());

    let day_ago = now - Duration::hours(24);
    let week_ago = now - Duration::days(7);
    let seen: Vec<NaiveDateTime> = records.iter().filter_map(|r| r.date_time()).collect();

    Some(NetworkStats {
        lqi,
        rssi,
        devices_total: records.len(),
        devices_last_24h: seen.iter().filter(|t| **t > day_ago).count(),
        devices_last_7d: seen.iter().filter(|t| **t > week_ago).count(),
        last_seen: seen
            .iter()
            .max()
            .map(|t| t.format(LAST_SEEN_FORMAT).to_string()),
    })
}

/// Médiane d'un effectif pair : moyenne des deux valeurs centrales en
/// division entière plancher (`div_euclid`), jamais en flottant.
fn min_med_max(mut values: Vec<i64>) -> MetricSummary {
    values.sort_unstable();
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]).div_euclid(2)
    };
    MetricSummary {
        min: values[0],
        median,
        max: values[values.len() - 1],
    }
}
