use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use mocha_core::farm::FarmSnapshot;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// Header trio that keeps intermediaries from serving stale capacity data.
const NO_CACHE: [(header::HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

#[derive(Deserialize)]
pub struct FarmQuery {
    #[serde(rename = "farmId")]
    farm_id: Option<u64>,
}

fn farm_json(snapshot: &FarmSnapshot) -> serde_json::Value {
    serde_json::json!({
        "id": snapshot.farm_id,
        "name": snapshot.name,
        "location": snapshot.location,
        "isActive": snapshot.active,
        "currentTrees": snapshot.current_trees,
        "treeCapacity": snapshot.tree_capacity,
        "availableCapacity": snapshot.available_capacity(),
        "farmer": snapshot.farmer,
        "metadataURI": snapshot.metadata_uri,
        "fetchedAt": snapshot.fetched_at,
        "source": snapshot.source,
    })
}

/// GET /api/farms — every farm the ledger knows, as snapshot summaries.
pub async fn list_farms(State(app): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let ledger = app.ledger.clone();
    let result = tokio::task::spawn_blocking(move || {
        let ids = ledger.all_farms()?;
        let mut farms = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(snapshot) = ledger.farm_snapshot(id)? {
                farms.push(farm_json(&snapshot));
            }
        }
        Ok::<_, mocha_core::LedgerError>(serde_json::json!(farms))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok((NO_CACHE, Json(result)))
}

/// GET /api/farm-data?farmId= — one farm, read fresh. No-cache headers are
/// mandatory: the orchestrator must never act on stale capacity numbers.
pub async fn farm_data(
    State(app): State<AppState>,
    Query(query): Query<FarmQuery>,
) -> Result<impl IntoResponse, AppError> {
    let farm_id = query
        .farm_id
        .ok_or_else(|| AppError::bad_request("farmId is required"))?;

    let ledger = app.ledger.clone();
    let snapshot = tokio::task::spawn_blocking(move || ledger.farm_snapshot(farm_id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??
        .ok_or_else(|| AppError::not_found(format!("farm {farm_id} not found")))?;

    Ok((NO_CACHE, Json(farm_json(&snapshot))))
}

/// GET /api/farm-investments?farmId= — recorded purchases on one farm.
pub async fn farm_investments(
    State(app): State<AppState>,
    Query(query): Query<FarmQuery>,
) -> Result<impl IntoResponse, AppError> {
    let farm_id = query
        .farm_id
        .ok_or_else(|| AppError::bad_request("farmId is required"))?;

    let ledger = app.ledger.clone();
    let investments = tokio::task::spawn_blocking(move || ledger.farm_investments(farm_id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let list: Vec<serde_json::Value> = investments
        .iter()
        .enumerate()
        .map(|(i, inv)| {
            serde_json::json!({
                "id": i,
                "farmId": inv.farm_id,
                "investor": inv.investor,
                "treeCount": inv.tree_count,
                "totalPaid": inv.total_paid,
                "timestamp": inv.timestamp,
                "isActive": inv.active,
            })
        })
        .collect();

    Ok((NO_CACHE, Json(serde_json::json!(list))))
}
