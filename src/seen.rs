//! Durable record of every listing already processed.

use crate::error::PersistenceError;
use crate::models::{Listing, ListingId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Listings seen in earlier runs, keyed by identifier.
///
/// Entries are only ever added or overwritten, never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenSet {
    entries: BTreeMap<ListingId, Listing>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ListingId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &ListingId) -> Option<&Listing> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ListingId, &Listing)> {
        self.entries.iter()
    }

    /// Insert or overwrite every entry of `items`
    pub fn merge(&mut self, items: BTreeMap<ListingId, Listing>) {
        self.entries.extend(items);
    }
}

impl FromIterator<(ListingId, Listing)> for SeenSet {
    fn from_iter<T: IntoIterator<Item = (ListingId, Listing)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// JSON file holding a [`SeenSet`]
#[derive(Debug, Clone)]
pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored set; [`PersistenceError::NotFound`] if it was never written
    pub async fn load(&self) -> Result<SeenSet, PersistenceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(self.path.clone()))
            }
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let seen: SeenSet = serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Format {
            path: self.path.clone(),
            source,
        })?;
        debug!("Loaded {} seen listings from {}", seen.len(), self.path.display());
        Ok(seen)
    }

    /// Like [`load`](Self::load), but a store that was never written is empty
    pub async fn load_or_empty(&self) -> Result<SeenSet, PersistenceError> {
        match self.load().await {
            Err(PersistenceError::NotFound(_)) => {
                info!("No seen-set at {}, starting empty", self.path.display());
                Ok(SeenSet::new())
            }
            other => other,
        }
    }

    /// Merge `items` into `existing` and replace the stored set with the result.
    ///
    /// The new contents go to a sibling temporary file that is synced and
    /// then renamed over the store, so a crash leaves either the old or the
    /// new set on disk.
    pub async fn merge_and_persist(
        &self,
        mut existing: SeenSet,
        items: BTreeMap<ListingId, Listing>,
    ) -> Result<SeenSet, PersistenceError> {
        existing.merge(items);

        // JSON cannot encode inf or NaN
        if let Some((id, _)) = existing
            .iter()
            .find(|(_, l)| !l.recurring_fee.is_finite() || !l.total_price.is_finite())
        {
            return Err(PersistenceError::NonFinite(id.clone()));
        }

        let json = serde_json::to_vec_pretty(&existing).map_err(|source| PersistenceError::Format {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(parent, source))?;
        }

        let tmp = self.temp_path();
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|source| self.io_error(&tmp, source))?;
        file.write_all(&json)
            .await
            .map_err(|source| self.io_error(&tmp, source))?;
        file.sync_all()
            .await
            .map_err(|source| self.io_error(&tmp, source))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| self.io_error(&self.path, source))?;

        info!("Recorded {} seen listings in {}", existing.len(), self.path.display());
        Ok(existing)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "seen".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
