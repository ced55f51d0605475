//! Lookups against `signed_restaurants`, the global set of places with a
//! business relationship.

use std::collections::HashSet;

use sqlx::PgPool;

use crate::DbError;

/// Returns the subset of `place_ids` present in `signed_restaurants`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_signed_among(
    pool: &PgPool,
    place_ids: &[String],
) -> Result<HashSet<String>, DbError> {
    if place_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows = sqlx::query_scalar::<_, String>(
        "SELECT place_id FROM signed_restaurants WHERE place_id = ANY($1)",
    )
    .bind(place_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}
