//! Visited marks: the optimistic in-memory set, its two backends, and the
//! `visited` command handlers.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::future::Future;

use crate::client::{ApiClient, ClientError};
use crate::store::{LocalVisitedStore, StoreError};

/// Where a visited mark is persisted.
pub(crate) trait VisitedBackend {
    type Error: Display;

    fn set_visited(
        &self,
        place_id: &str,
        visited: bool,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

impl VisitedBackend for LocalVisitedStore {
    type Error = StoreError;

    async fn set_visited(&self, place_id: &str, visited: bool) -> Result<(), StoreError> {
        self.set(place_id, visited).await
    }
}

impl VisitedBackend for ApiClient {
    type Error = ClientError;

    async fn set_visited(&self, place_id: &str, visited: bool) -> Result<(), ClientError> {
        ApiClient::set_visited(self, place_id, visited).await
    }
}

impl<B: VisitedBackend> VisitedBackend for &B {
    type Error = B::Error;

    async fn set_visited(&self, place_id: &str, visited: bool) -> Result<(), B::Error> {
        (**self).set_visited(place_id, visited).await
    }
}

/// In-memory visited set whose toggles are applied before the backend call
/// and rolled back if the call fails.
#[derive(Debug)]
pub(crate) struct VisitedSet<B> {
    ids: BTreeSet<String>,
    backend: B,
}

impl<B: VisitedBackend> VisitedSet<B> {
    pub(crate) fn new(ids: impl IntoIterator<Item = String>, backend: B) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            backend,
        }
    }

    pub(crate) fn contains(&self, place_id: &str) -> bool {
        self.ids.contains(place_id)
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Marks or unmarks `place_id`.
    ///
    /// # Errors
    ///
    /// Returns the backend error after restoring the previous local state.
    pub(crate) async fn toggle(&mut self, place_id: &str, visited: bool) -> Result<(), B::Error> {
        let changed = if visited {
            self.ids.insert(place_id.to_owned())
        } else {
            self.ids.remove(place_id)
        };

        if let Err(e) = self.backend.set_visited(place_id, visited).await {
            if changed {
                if visited {
                    self.ids.remove(place_id);
                } else {
                    self.ids.insert(place_id.to_owned());
                }
            }
            tracing::warn!(place_id, visited, error = %e, "visited update failed; rolled back");
            return Err(e);
        }
        Ok(())
    }
}

/// Target of a `visited` subcommand.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Target<'a> {
    Local(&'a LocalVisitedStore),
    Cloud(&'a ApiClient),
}

impl VisitedBackend for Target<'_> {
    type Error = anyhow::Error;

    async fn set_visited(&self, place_id: &str, visited: bool) -> anyhow::Result<()> {
        match self {
            Target::Local(store) => Ok(store.set(place_id, visited).await?),
            Target::Cloud(api) => ApiClient::set_visited(api, place_id, visited)
                .await
                .map_err(login_hint),
        }
    }
}

/// Visited set for marking search rows. A stored session reads the
/// account's list; no session, or one the server rejects, reads the local
/// file.
///
/// # Errors
///
/// Returns an error if the local file cannot be read or the server fails
/// with anything other than 401.
pub(crate) async fn visited_for_search<'a>(
    local: &'a LocalVisitedStore,
    api: &'a ApiClient,
) -> anyhow::Result<VisitedSet<Target<'a>>> {
    if api.has_session() {
        match api.list_visited().await {
            Ok(ids) => return Ok(VisitedSet::new(ids, Target::Cloud(api))),
            Err(e) if e.is_unauthorized() => {
                tracing::warn!(error = %e, "session rejected; using local visited marks");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(VisitedSet::new(local.load().await?, Target::Local(local)))
}

/// Prints the visited set, one place id per line.
///
/// # Errors
///
/// Returns an error if the local file cannot be read or the server rejects
/// the request.
pub(crate) async fn run_visited_list(target: Target<'_>) -> anyhow::Result<()> {
    match target {
        Target::Local(store) => print_visited(&VisitedSet::new(store.load().await?, store)),
        Target::Cloud(api) => {
            print_visited(&VisitedSet::new(api.list_visited().await.map_err(login_hint)?, api));
        }
    }
    Ok(())
}

fn print_visited<B: VisitedBackend>(set: &VisitedSet<B>) {
    if set.is_empty() {
        println!("no visited restaurants");
        return;
    }
    for id in set.ids() {
        println!("{id}");
    }
    println!("{} visited", set.len());
}

/// Marks or unmarks one place.
///
/// # Errors
///
/// Returns an error if the id is blank or the backend update fails.
pub(crate) async fn run_visited_set(
    target: Target<'_>,
    place_id: &str,
    visited: bool,
) -> anyhow::Result<()> {
    let place_id = place_id.trim();
    if place_id.is_empty() {
        anyhow::bail!("place id must not be blank");
    }

    let action = if visited { "marked" } else { "unmarked" };
    match target {
        Target::Local(store) => {
            let mut set = VisitedSet::new(store.load().await?, store.clone());
            set.toggle(place_id, visited).await?;
            println!("{action} {place_id} ({} visited locally)", set.len());
        }
        Target::Cloud(api) => {
            let ids = api.list_visited().await.map_err(login_hint)?;
            let mut set = VisitedSet::new(ids, api);
            set.toggle(place_id, visited).await.map_err(login_hint)?;
            println!("{action} {place_id} ({} visited in cloud)", set.len());
        }
    }
    Ok(())
}

/// Uploads every locally visited id to the signed-in account.
///
/// # Errors
///
/// Returns an error if the local file cannot be read or the import request
/// fails.
pub(crate) async fn run_visited_import(
    store: &LocalVisitedStore,
    api: &ApiClient,
) -> anyhow::Result<()> {
    let ids: Vec<String> = store.load().await?.into_iter().collect();
    if ids.is_empty() {
        println!("no local visited marks to import");
        return Ok(());
    }
    let imported = api.import_visited(&ids).await.map_err(login_hint)?;
    println!("imported {imported} visited marks");
    Ok(())
}

fn login_hint(err: ClientError) -> anyhow::Error {
    if err.is_unauthorized() {
        anyhow::anyhow!("{err}; run `nearbite login` first")
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[derive(Default)]
    struct FakeBackend {
        fail: Cell<bool>,
        calls: RefCell<Vec<(String, bool)>>,
    }

    impl VisitedBackend for FakeBackend {
        type Error = String;

        async fn set_visited(&self, place_id: &str, visited: bool) -> Result<(), String> {
            self.calls.borrow_mut().push((place_id.to_owned(), visited));
            if self.fail.get() {
                Err("backend down".to_owned())
            } else {
                Ok(())
            }
        }
    }

    fn set(ids: &[&str]) -> VisitedSet<FakeBackend> {
        VisitedSet::new(ids.iter().map(|s| (*s).to_owned()), FakeBackend::default())
    }

    #[tokio::test]
    async fn toggle_on_adds_and_calls_backend() {
        let mut visited = set(&[]);
        visited.toggle("p1", true).await.unwrap();
        assert!(visited.contains("p1"));
        assert_eq!(
            *visited.backend.calls.borrow(),
            vec![("p1".to_owned(), true)]
        );
    }

    #[tokio::test]
    async fn failed_mark_rolls_back() {
        let mut visited = set(&["p0"]);
        visited.backend.fail.set(true);
        let err = visited.toggle("p1", true).await.unwrap_err();
        assert_eq!(err, "backend down");
        assert!(!visited.contains("p1"));
        assert_eq!(visited.ids().collect::<Vec<_>>(), vec!["p0"]);
    }

    #[tokio::test]
    async fn failed_unmark_restores_id() {
        let mut visited = set(&["p1"]);
        visited.backend.fail.set(true);
        assert!(visited.toggle("p1", false).await.is_err());
        assert!(visited.contains("p1"));
    }

    #[tokio::test]
    async fn failed_redundant_mark_keeps_existing_id() {
        let mut visited = set(&["p1"]);
        visited.backend.fail.set(true);
        assert!(visited.toggle("p1", true).await.is_err());
        assert!(visited.contains("p1"), "id was already present before the toggle");
    }

    struct Fixture {
        server: MockServer,
        dir: std::path::PathBuf,
        local: LocalVisitedStore,
    }

    impl Fixture {
        async fn new(local_ids: &[&str]) -> Self {
            let dir =
                std::env::temp_dir().join(format!("nearbite-visited-{}", uuid::Uuid::new_v4()));
            let local = LocalVisitedStore::in_dir(&dir);
            for id in local_ids {
                local.set(id, true).await.unwrap();
            }
            Self {
                server: MockServer::start().await,
                dir,
                local,
            }
        }

        fn api(&self, session: Option<&str>) -> ApiClient {
            ApiClient::new(&self.server.uri(), 5)
                .unwrap()
                .with_session(session.map(str::to_owned))
        }

        async fn cleanup(self) {
            tokio::fs::remove_dir_all(&self.dir).await.unwrap();
        }
    }

    #[tokio::test]
    async fn search_marks_come_from_cloud_when_signed_in() {
        let fx = Fixture::new(&["local1"]).await;
        Mock::given(method("GET"))
            .and(path("/api/visited"))
            .and(header("cookie", "mr_session=tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"placeIds": ["cloud1"]})))
            .expect(1)
            .mount(&fx.server)
            .await;

        let api = fx.api(Some("mr_session=tok"));
        let set = visited_for_search(&fx.local, &api).await.unwrap();
        assert!(set.contains("cloud1"));
        assert!(!set.contains("local1"));
        assert!(matches!(set.backend, Target::Cloud(_)));
        fx.cleanup().await;
    }

    #[tokio::test]
    async fn rejected_session_falls_back_to_local_marks() {
        let fx = Fixture::new(&["local1"]).await;
        Mock::given(method("GET"))
            .and(path("/api/visited"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": "unauthorized", "message": "Not signed in"}
            })))
            .expect(1)
            .mount(&fx.server)
            .await;

        let api = fx.api(Some("mr_session=expired"));
        let set = visited_for_search(&fx.local, &api).await.unwrap();
        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["local1"]);
        assert!(matches!(set.backend, Target::Local(_)));
        fx.cleanup().await;
    }

    #[tokio::test]
    async fn no_session_reads_local_marks_without_calling_server() {
        let fx = Fixture::new(&["local1"]).await;
        Mock::given(method("GET"))
            .and(path("/api/visited"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"placeIds": []})))
            .expect(0)
            .mount(&fx.server)
            .await;

        let api = fx.api(None);
        let set = visited_for_search(&fx.local, &api).await.unwrap();
        assert!(set.contains("local1"));
        fx.cleanup().await;
    }

    #[tokio::test]
    async fn server_failure_is_not_masked_by_local_marks() {
        let fx = Fixture::new(&["local1"]).await;
        Mock::given(method("GET"))
            .and(path("/api/visited"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": {"code": "internal", "message": "db down"}
            })))
            .mount(&fx.server)
            .await;

        let api = fx.api(Some("mr_session=tok"));
        assert!(visited_for_search(&fx.local, &api).await.is_err());
        fx.cleanup().await;
    }

    #[tokio::test]
    async fn local_backend_persists_toggle() {
        let dir = std::env::temp_dir().join(format!("nearbite-visited-{}", uuid::Uuid::new_v4()));
        let store = LocalVisitedStore::in_dir(&dir);
        let mut visited = VisitedSet::new(Vec::new(), &store);
        visited.toggle("p9", true).await.unwrap();
        assert!(store.load().await.unwrap().contains("p9"));
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
