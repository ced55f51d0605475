//! Live integration tests for nearbite-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/nearbite-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use nearbite_db::{import_visited, list_signed_among, list_visited, mark_visited, unmark_visited};

/// `signed_restaurants` is curated outside the app; tests seed it directly.
async fn seed_signed(pool: &sqlx::PgPool, place_id: &str, note: Option<&str>) {
    sqlx::query("INSERT INTO signed_restaurants (place_id, note) VALUES ($1, $2)")
        .bind(place_id)
        .bind(note)
        .execute(pool)
        .await
        .expect("seed signed_restaurants failed");
}

async fn count_rows(pool: &sqlx::PgPool, user_id: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM visited_restaurants WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("count query failed")
}

fn place_ids(rows: &[nearbite_db::VisitedRow]) -> Vec<&str> {
    rows.iter().map(|r| r.place_id.as_str()).collect()
}

#[sqlx::test(migrations = "../../migrations")]
async fn mark_is_idempotent(pool: sqlx::PgPool) {
    mark_visited(&pool, "alice", "p1").await.unwrap();
    mark_visited(&pool, "alice", "p1").await.unwrap();

    assert_eq!(count_rows(&pool, "alice").await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn marks_are_scoped_per_user(pool: sqlx::PgPool) {
    mark_visited(&pool, "alice", "p1").await.unwrap();
    mark_visited(&pool, "bob", "p2").await.unwrap();

    let alice = list_visited(&pool, "alice").await.unwrap();
    assert_eq!(place_ids(&alice), vec!["p1"]);
    let bob = list_visited(&pool, "bob").await.unwrap();
    assert_eq!(place_ids(&bob), vec!["p2"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn unmark_removes_the_row(pool: sqlx::PgPool) {
    mark_visited(&pool, "alice", "p1").await.unwrap();

    assert!(unmark_visited(&pool, "alice", "p1").await.unwrap());
    assert!(!unmark_visited(&pool, "alice", "p1").await.unwrap());
    assert!(list_visited(&pool, "alice").await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn importing_twice_does_not_grow_the_relation(pool: sqlx::PgPool) {
    let ids = ["p1", "p2", " p3 ", ""];

    let first = import_visited(&pool, "alice", &ids).await.unwrap();
    assert_eq!(first, 3);
    assert_eq!(count_rows(&pool, "alice").await, 3);

    let second = import_visited(&pool, "alice", &ids).await.unwrap();
    assert_eq!(second, 3);
    assert_eq!(count_rows(&pool, "alice").await, 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn import_merges_with_existing_marks(pool: sqlx::PgPool) {
    mark_visited(&pool, "alice", "p1").await.unwrap();
    import_visited(&pool, "alice", &["p1", "p2", "p2"]).await.unwrap();

    let mut ids: Vec<String> = list_visited(&pool, "alice")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.place_id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["p1", "p2"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn empty_import_is_a_no_op(pool: sqlx::PgPool) {
    let empty: [&str; 0] = [];
    assert_eq!(import_visited(&pool, "alice", &empty).await.unwrap(), 0);
    assert_eq!(count_rows(&pool, "alice").await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn signed_lookup_returns_only_signed_subset(pool: sqlx::PgPool) {
    seed_signed(&pool, "p2", Some("partner")).await;
    seed_signed(&pool, "p9", None).await;

    let ids = vec!["p1".to_string(), "p2".to_string(), "p3".to_string()];
    let signed = list_signed_among(&pool, &ids).await.unwrap();
    assert_eq!(signed.len(), 1);
    assert!(signed.contains("p2"));

    assert!(list_signed_among(&pool, &[]).await.unwrap().is_empty());
}
