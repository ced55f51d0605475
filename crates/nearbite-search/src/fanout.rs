//! Bounded-concurrency detail enrichment.
//!
//! Place ids are processed in sequential batches of at most `limit`. All
//! fetches within a batch run concurrently and the whole batch is joined
//! before the next one starts, so no more than `limit` detail calls are ever
//! outstanding against the provider.

use futures::future::join_all;

use nearbite_core::EnrichedResult;
use nearbite_places::PlacesGateway;

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Fetches details for every id, preserving input order.
///
/// A failed fetch yields `None` in that slot and is logged; it never aborts
/// the remaining fetches. A `limit` of 0 is treated as 1.
pub async fn enrich<G: PlacesGateway>(
    gateway: &G,
    place_ids: &[String],
    limit: usize,
) -> Vec<Option<EnrichedResult>> {
    let limit = limit.max(1);
    let mut out = Vec::with_capacity(place_ids.len());

    for (batch_index, batch) in place_ids.chunks(limit).enumerate() {
        tracing::debug!(batch_index, size = batch.len(), "enriching batch");
        let fetched = join_all(batch.iter().map(|place_id| async move {
            match gateway.get_details(place_id).await {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::warn!(
                        place_id = %place_id,
                        error = %e,
                        "place details fetch failed; dropping from page"
                    );
                    None
                }
            }
        }))
        .await;
        out.extend(fetched);
    }

    out
}
