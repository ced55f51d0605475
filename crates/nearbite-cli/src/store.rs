//! Files the CLI keeps between runs: the local visited set and the session
//! cookie.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const VISITED_FILE: &str = "visited.json";
const SESSION_FILE: &str = "session";

#[derive(Debug, thiserror::Error)]
pub(crate) enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a JSON array of place ids: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

async fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(io_error(parent))?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, contents).await.map_err(io_error(&tmp))?;
    tokio::fs::rename(&tmp, path).await.map_err(io_error(path))
}

/// Visited place ids persisted as a JSON array in `<data-dir>/visited.json`.
///
/// A missing file is an empty set. A file that does not parse is an error
/// rather than an empty set so the next write cannot clobber it.
#[derive(Debug, Clone)]
pub(crate) struct LocalVisitedStore {
    path: PathBuf,
}

impl LocalVisitedStore {
    pub(crate) fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(VISITED_FILE),
        }
    }

    pub(crate) async fn load(&self) -> Result<BTreeSet<String>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(io_error(&self.path)(e)),
        };
        let ids: Vec<String> =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(ids
            .into_iter()
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty())
            .collect())
    }

    pub(crate) async fn save(&self, ids: &BTreeSet<String>) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(ids).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        write_atomically(&self.path, &body).await
    }

    /// Loads, applies one mark, and writes the set back.
    pub(crate) async fn set(&self, place_id: &str, visited: bool) -> Result<(), StoreError> {
        let mut ids = self.load().await?;
        let changed = if visited {
            ids.insert(place_id.to_owned())
        } else {
            ids.remove(place_id)
        };
        if changed {
            self.save(&ids).await?;
        }
        Ok(())
    }
}

/// The `mr_session=...` cookie from the last successful login.
#[derive(Debug, Clone)]
pub(crate) struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub(crate) fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SESSION_FILE),
        }
    }

    pub(crate) async fn load(&self) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let cookie = contents.trim();
                Ok((!cookie.is_empty()).then(|| cookie.to_owned()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&self.path)(e)),
        }
    }

    pub(crate) async fn save(&self, cookie: &str) -> Result<(), StoreError> {
        write_atomically(&self.path, cookie.as_bytes()).await
    }

    pub(crate) async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&self.path)(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("nearbite-store-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn missing_visited_file_is_empty() {
        let store = LocalVisitedStore::in_dir(&temp_dir());
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_persists_each_mutation() {
        let dir = temp_dir();
        let store = LocalVisitedStore::in_dir(&dir);
        store.set("b", true).await.unwrap();
        store.set("a", true).await.unwrap();
        store.set("b", false).await.unwrap();

        let reopened = LocalVisitedStore::in_dir(&dir);
        let ids: Vec<String> = reopened.load().await.unwrap().into_iter().collect();
        assert_eq!(ids, vec!["a"]);
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn blank_ids_in_file_are_dropped() {
        let dir = temp_dir();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join(VISITED_FILE), r#"["p1", "  ", "p2 "]"#)
            .await
            .unwrap();
        let ids = LocalVisitedStore::in_dir(&dir).load().await.unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["p1", "p2"]);
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_visited_file_is_an_error() {
        let dir = temp_dir();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join(VISITED_FILE), "{not json")
            .await
            .unwrap();
        let err = LocalVisitedStore::in_dir(&dir).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn session_round_trips_and_clears() {
        let dir = temp_dir();
        let session = SessionFile::in_dir(&dir);
        assert_eq!(session.load().await.unwrap(), None);

        session.save("mr_session=abc.def").await.unwrap();
        assert_eq!(
            session.load().await.unwrap().as_deref(),
            Some("mr_session=abc.def")
        );

        session.clear().await.unwrap();
        session.clear().await.unwrap();
        assert_eq!(session.load().await.unwrap(), None);
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
