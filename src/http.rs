/**
 * API HTTP - Surface de requêtes du moniteur
 *
 * RÔLE :
 * Ce module expose les classements et statistiques du mesh en HTTP.
 * Il traduit les paramètres de requête, prend un instantané du store et
 * délègue tout calcul au module queries.
 *
 * FONCTIONNEMENT :
 * - Routes : /health, /topN (classement), /stats (statistiques)
 * - Paramètre `format` : json (défaut) ou tile (texte compact pour tuile
 *   de dashboard), sélecteur inconnu = 400
 * - Paramètre `n` de /topN : entier, 0 ou négatif = classement complet,
 *   valeur non numérique = 400
 *
 * UTILITÉ DANS ZIGMON :
 * 🎯 Diagnostic du mesh : quels périphériques ont le lien le plus faible
 * 🎯 Intégration dashboard : la sortie tile s'affiche telle quelle
 */

use crate::models::DeviceRecord;
use crate::queries::{self, NetworkStats};
use crate::store::SharedStore;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Local;
use std::collections::HashMap;

/// Sélecteurs acceptés par le paramètre `format`
const FORMATS: [&str; 2] = ["json", "tile"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Tile,
}

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/topN", get(get_top_n))
        .route("/stats", get(get_stats))
        .with_state(app_state)
}

/// Vue d'un relevé exposée par l'API : les champs du hub plus `idHex`
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceView {
    name: String,
    id: u16,
    id_hex: String,
    profile_id: u16,
    cluster_id: u16,
    source_endpoint: u8,
    destination_endpoint: u8,
    group_id: u16,
    sequence: u16,
    last_hop_lqi: u8,
    last_hop_rssi: i16,
    time: String,
    #[serde(rename = "type")]
    event_type: String,
}

fn to_view(record: &DeviceRecord) -> DeviceView {
    DeviceView {
        name: record.name.clone(),
        id: record.id,
        id_hex: record.id_hex(),
        profile_id: record.profile_id,
        cluster_id: record.cluster_id,
        source_endpoint: record.source_endpoint,
        destination_endpoint: record.destination_endpoint,
        group_id: record.group_id,
        sequence: record.sequence,
        last_hop_lqi: record.last_hop_lqi,
        last_hop_rssi: record.last_hop_rssi,
        time: record.time.clone(),
        event_type: record.event_type.clone(),
    }
}

fn parse_format(params: &HashMap<String, String>) -> Result<OutputFormat, Response> {
    match params.get("format").map(String::as_str).unwrap_or("json") {
        "json" => Ok(OutputFormat::Json),
        "tile" => Ok(OutputFormat::Tile),
        other => Err((
            StatusCode::BAD_REQUEST,
            format!("Invalid format '{other}'. Valid formats: {FORMATS:?}"),
        )
            .into_response()),
    }
}

fn parse_count(params: &HashMap<String, String>) -> Result<i64, Response> {
    let raw = params.get("n").map(String::as_str).unwrap_or("0");
    raw.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid count '{raw}'. Expected an integer."),
        )
            .into_response()
    })
}

// GET /topN?n=..&format=.. (classement du lien le plus faible au plus fort)
async fn get_top_n(
    State(app): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let format = match parse_format(&params) {
        Ok(format) => format,
        Err(response) => return response,
    };
    let n = match parse_count(&params) {
        Ok(n) => n,
        Err(response) => return response,
    };

    let ranked = queries::top_n(app.store.snapshot(), n);
    match format {
        OutputFormat::Json => {
            Json(ranked.iter().map(to_view).collect::<Vec<_>>()).into_response()
        }
        OutputFormat::Tile => {
            let lines: Vec<String> = ranked
                .iter()
                .map(|r| {
                    format!(
                        "{} {} lqi={} rssi={}",
                        r.id_hex(),
                        r.name,
                        r.last_hop_lqi,
                        r.last_hop_rssi
                    )
                })
                .collect();
            lines.join("\n").into_response()
        }
    }
}

// GET /stats?format=.. (min/médiane/max, comptages de fraîcheur)
async fn get_stats(
    State(app): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let format = match parse_format(&params) {
        Ok(format) => format,
        Err(response) => return response,
    };

    let snapshot = app.store.snapshot();
    // Table vide : corps vide, pas une erreur
    let Some(stats) = queries::network_stats(&snapshot, Local::now().naive_local()) else {
        return String::new().into_response();
    };

    match format {
        OutputFormat::Json => Json(stats).into_response(),
        OutputFormat::Tile => stats_tile(&stats).into_response(),
    }
}

/// Résumé texte des statistiques, une métrique par ligne
fn stats_tile(stats: &NetworkStats) -> String {
    let mut lines = vec![
        format!(
            "LQI {}/{}/{}",
            stats.lqi.min, stats.lqi.median, stats.lqi.max
        ),
        format!(
            "RSSI {}/{}/{}",
            stats.rssi.min, stats.rssi.median, stats.rssi.max
        ),
        format!(
            "{} devices, {} <24h, {} <7d",
            stats.devices_total, stats.devices_last_24h, stats.devices_last_7d
        ),
    ];
    if let Some(last_seen) = &stats.last_seen {
        lines.push(format!("last seen {last_seen}"));
    }
    lines.join("\n")
}
