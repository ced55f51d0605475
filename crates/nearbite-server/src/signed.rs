use std::collections::HashSet;

use nearbite_db::DbError;
use nearbite_search::SignedLookup;
use sqlx::PgPool;

/// Signed-restaurant lookup backed by the `signed_restaurants` table.
#[derive(Clone)]
pub struct DbSignedLookup {
    pool: PgPool,
}

impl DbSignedLookup {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SignedLookup for DbSignedLookup {
    type Error = DbError;

    async fn signed_among(&self, place_ids: &[String]) -> Result<HashSet<String>, DbError> {
        nearbite_db::list_signed_among(&self.pool, place_ids).await
    }
}
