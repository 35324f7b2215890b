//! Client for the optional HTTP read layer in front of the ledger. Every
//! request asks for uncached data — acting on stale capacity numbers is how
//! doomed purchases get submitted.

use crate::error::LedgerError;
use crate::farm::{FarmSnapshot, SnapshotSource};
use alloy_primitives::Address;
use chrono::Utc;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FarmDataDto {
    id: u64,
    name: String,
    location: String,
    is_active: bool,
    current_trees: u64,
    tree_capacity: u64,
    farmer: Address,
    #[serde(rename = "metadataURI", default)]
    metadata_uri: String,
}

// ---------------------------------------------------------------------------
// SnapshotClient
// ---------------------------------------------------------------------------

pub struct SnapshotClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl SnapshotClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Fetch one farm snapshot through the read layer. The result is marked
    /// `SnapshotSource::Cache`; inconsistent counters are a decode error,
    /// never silently clamped.
    pub fn fetch(&self, farm_id: u64) -> Result<FarmSnapshot, LedgerError> {
        let url = format!("{}/api/farm-data?farmId={farm_id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .header(reqwest::header::PRAGMA, "no-cache")
            .send()
            .map_err(|e| LedgerError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Http(format!("{status} fetching farm {farm_id}")));
        }

        let dto: FarmDataDto = response
            .json()
            .map_err(|e| LedgerError::Decode(e.to_string()))?;

        let snapshot = FarmSnapshot {
            farm_id: dto.id,
            name: dto.name,
            location: dto.location,
            active: dto.is_active,
            current_trees: dto.current_trees,
            tree_capacity: dto.tree_capacity,
            farmer: dto.farmer,
            metadata_uri: dto.metadata_uri,
            fetched_at: Utc::now(),
            source: SnapshotSource::Cache,
        };
        if !snapshot.is_consistent() {
            return Err(LedgerError::Decode(format!(
                "farm {farm_id}: currentTrees {} exceeds treeCapacity {}",
                snapshot.current_trees, snapshot.tree_capacity
            )));
        }
        Ok(snapshot)
    }

    /// Display-only degraded read: on any failure, return a snapshot that is
    /// visibly `Fallback` rather than pretending the read happened.
    pub fn fetch_or_fallback(&self, farm_id: u64) -> FarmSnapshot {
        match self.fetch(farm_id) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(farm = farm_id, error = %e, "snapshot fetch failed; using fallback");
                FarmSnapshot::fallback(farm_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn farm_body(current: u64, capacity: u64) -> String {
        format!(
            r#"{{
                "id": 1,
                "name": "Ethiopian Highlands Farm",
                "location": "Yirgacheffe, Ethiopia",
                "isActive": true,
                "currentTrees": {current},
                "treeCapacity": {capacity},
                "farmer": "0x742d35Cc6634C0532925a3b8D0c4E4C4c4C4c4C4",
                "metadataURI": "https://metadata.projectmocha.com/farm/1"
            }}"#
        )
    }

    #[test]
    fn fetch_decodes_and_marks_cache_source() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/api/farm-data")
            .match_query(Matcher::UrlEncoded("farmId".into(), "1".into()))
            .match_header("cache-control", "no-cache")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(farm_body(1500, 2000))
            .create();

        let client = SnapshotClient::new(server.url());
        let snapshot = client.fetch(1).unwrap();

        mock.assert();
        assert_eq!(snapshot.farm_id, 1);
        assert_eq!(snapshot.available_capacity(), 500);
        assert_eq!(snapshot.source, SnapshotSource::Cache);
        assert!(snapshot.active);
    }

    #[test]
    fn inconsistent_counters_are_a_decode_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/farm-data")
            .match_query(Matcher::UrlEncoded("farmId".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(farm_body(3000, 2000))
            .create();

        let client = SnapshotClient::new(server.url());
        assert!(matches!(client.fetch(1), Err(LedgerError::Decode(_))));
    }

    #[test]
    fn http_error_status_is_surfaced() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/farm-data")
            .match_query(Matcher::UrlEncoded("farmId".into(), "7".into()))
            .with_status(404)
            .create();

        let client = SnapshotClient::new(server.url());
        assert!(matches!(client.fetch(7), Err(LedgerError::Http(_))));
    }

    #[test]
    fn fallback_snapshot_is_visibly_degraded() {
        // Nothing listening on this port.
        let client = SnapshotClient::new("http://127.0.0.1:9");
        let snapshot = client.fetch_or_fallback(3);
        assert_eq!(snapshot.source, SnapshotSource::Fallback);
        assert!(!snapshot.active);
    }
}
