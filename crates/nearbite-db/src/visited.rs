//! Database operations for `visited_restaurants`.
//!
//! One row per `(user_id, place_id)`; absence means "not visited".

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VisitedRow {
    pub place_id: String,
    pub visited_at: DateTime<Utc>,
}

/// Trims ids and drops blanks, keeping submission order.
#[must_use]
pub fn normalize_place_ids<S: AsRef<str>>(place_ids: &[S]) -> Vec<String> {
    place_ids
        .iter()
        .map(|id| id.as_ref().trim())
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Lists every place the user has marked, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_visited(pool: &PgPool, user_id: &str) -> Result<Vec<VisitedRow>, DbError> {
    let rows = sqlx::query_as::<_, VisitedRow>(
        "SELECT place_id, visited_at FROM visited_restaurants \
         WHERE user_id = $1 \
         ORDER BY visited_at, place_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Marks a place visited. Marking an already-visited place refreshes
/// `visited_at` and never creates a second row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn mark_visited(pool: &PgPool, user_id: &str, place_id: &str) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO visited_restaurants (user_id, place_id) \
         VALUES ($1, $2) \
         ON CONFLICT (user_id, place_id) DO UPDATE SET visited_at = NOW()",
    )
    .bind(user_id)
    .bind(place_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Removes a visited mark. Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn unmark_visited(pool: &PgPool, user_id: &str, place_id: &str) -> Result<bool, DbError> {
    let result = sqlx::query(
        "DELETE FROM visited_restaurants WHERE user_id = $1 AND place_id = $2",
    )
    .bind(user_id)
    .bind(place_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Bulk-imports place ids for a user in one round-trip.
///
/// Ids are trimmed and blanks dropped. Existing marks are left untouched, so
/// importing the same set twice yields the same rows. Returns the number of
/// ids submitted after normalization, not the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn import_visited<S: AsRef<str>>(
    pool: &PgPool,
    user_id: &str,
    place_ids: &[S],
) -> Result<usize, DbError> {
    let place_ids = normalize_place_ids(place_ids);
    if place_ids.is_empty() {
        return Ok(0);
    }

    sqlx::query(
        "INSERT INTO visited_restaurants (user_id, place_id) \
         SELECT $1, * FROM UNNEST($2::text[]) \
         ON CONFLICT (user_id, place_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(&place_ids)
    .execute(pool)
    .await?;

    Ok(place_ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_drops_blanks() {
        let ids = normalize_place_ids(&[" a ", "", "   ", "b", "a"]);
        assert_eq!(ids, vec!["a", "b", "a"]);
    }

    #[test]
    fn normalize_of_empty_is_empty() {
        let empty: [&str; 0] = [];
        assert!(normalize_place_ids(&empty).is_empty());
    }
}
