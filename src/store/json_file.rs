use super::memory::next_id;
use super::{check_unique_active, check_valid, order_for_evaluation, TargetStore};
use crate::error::StoreError;
use crate::target::Target;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Keeps the whole target table as a JSON array in a single file.
///
/// Every `upsert` is a full read-modify-write under `lock`, and the file is
/// swapped in with a rename so readers never see a half-written table.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and checks every row. Hand-written rows without an id get one
    /// here; the flag says whether any did, so the caller can write them back
    /// and later upserts update the row instead of appending a copy.
    async fn read_all(&self) -> Result<(Vec<Target>, bool), StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), false)),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok((Vec::new(), false));
        }
        let mut rows: Vec<Target> = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))?;

        for (i, row) in rows.iter().enumerate() {
            row.validate().map_err(|e| {
                StoreError::Corrupt(format!("{} row {} ({}): {}", self.path.display(), i, row.symbol, e))
            })?;
        }

        let mut assigned = false;
        for i in 0..rows.len() {
            if rows[i].id.is_none() {
                rows[i].id = Some(next_id(&rows));
                assigned = true;
            }
        }
        Ok((rows, assigned))
    }

    async fn write_all(&self, rows: &[Target]) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(rows)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl TargetStore for JsonFileStore {
    async fn load_active(&self) -> Result<Vec<Target>, StoreError> {
        let _guard = self.lock.lock().await;
        let (rows, assigned) = self.read_all().await?;
        if assigned {
            self.write_all(&rows).await?;
            tracing::info!(path = %self.path.display(), "assigned ids to new rows");
        }
        let mut active: Vec<Target> = rows.into_iter().filter(|t| t.active).collect();
        order_for_evaluation(&mut active);
        tracing::debug!(path = %self.path.display(), count = active.len(), "loaded active targets");
        Ok(active)
    }

    async fn upsert(&self, mut target: Target) -> Result<Target, StoreError> {
        check_valid(&target)?;
        let _guard = self.lock.lock().await;
        let (mut rows, _) = self.read_all().await?;
        check_unique_active(&rows, &target)?;
        target.updated_at = Some(Utc::now());

        match target.id {
            None => {
                target.id = Some(next_id(&rows));
                rows.push(target.clone());
            }
            Some(id) => match rows.iter_mut().find(|t| t.id == Some(id)) {
                Some(row) => *row = target.clone(),
                None => rows.push(target.clone()),
            },
        }

        self.write_all(&rows).await?;
        Ok(target)
    }
}
