use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use gridgrant_core_types::ConnectorId;
use gridgrant_data_needs::DataNeed;

use crate::calculator::{check_compatibility, CompatibilityResult};
use crate::metadata::RegionConnectorMetadata;

/// Evaluates one need against every candidate connector concurrently.
///
/// Results come back in the order the connectors were given. All
/// evaluations share the same `now`, so a need is judged against a single
/// consistent instant.
pub async fn check_all(
    need: Arc<DataNeed>,
    connectors: Vec<RegionConnectorMetadata>,
    now: DateTime<Utc>,
) -> Vec<(ConnectorId, CompatibilityResult)> {
    let mut handles = Vec::with_capacity(connectors.len());
    for connector in connectors {
        let need = Arc::clone(&need);
        let id = connector.id.clone();
        let handle = tokio::spawn(async move { check_compatibility(&need, &connector, now) });
        handles.push((id, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (id, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    target: "gridgrant-compatibility",
                    connector = %id,
                    "compatibility evaluation task failed: {err}"
                );
                CompatibilityResult::unsupported("evaluation task failed")
            }
        };
        results.push((id, result));
    }
    results
}
