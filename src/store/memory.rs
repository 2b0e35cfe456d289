use super::{check_unique_active, check_valid, order_for_evaluation, TargetStore};
use crate::error::StoreError;
use crate::target::Target;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

/// Process-local store. Backs dry runs and tests.
pub struct MemoryTargetStore {
    rows: Mutex<Vec<Target>>,
}

impl Default for MemoryTargetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTargetStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    /// Seeds the store; rows without an id get one assigned.
    pub fn with_targets(targets: Vec<Target>) -> Self {
        let mut rows = Vec::with_capacity(targets.len());
        for mut t in targets {
            if t.id.is_none() {
                t.id = Some(next_id(&rows));
            }
            rows.push(t);
        }
        Self {
            rows: Mutex::new(rows),
        }
    }

    pub async fn snapshot(&self) -> Vec<Target> {
        self.rows.lock().await.clone()
    }
}

pub(crate) fn next_id(rows: &[Target]) -> u64 {
    rows.iter().filter_map(|t| t.id).max().unwrap_or(0) + 1
}

#[async_trait]
impl TargetStore for MemoryTargetStore {
    async fn load_active(&self) -> Result<Vec<Target>, StoreError> {
        let rows = self.rows.lock().await;
        let mut active: Vec<Target> = rows.iter().filter(|t| t.active).cloned().collect();
        order_for_evaluation(&mut active);
        Ok(active)
    }

    async fn upsert(&self, mut target: Target) -> Result<Target, StoreError> {
        check_valid(&target)?;
        let mut rows = self.rows.lock().await;
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
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Direction;
    use rust_decimal::Decimal;

    fn btc(target: i64) -> Target {
        Target::new("BTC", "bitcoin", Decimal::from(target), Direction::Up).unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let store = MemoryTargetStore::new();
        let a = store.upsert(btc(100)).await.unwrap();
        let b = store.upsert(btc(200)).await.unwrap();
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
        assert!(a.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_update_replaces_matching_row() {
        let store = MemoryTargetStore::with_targets(vec![btc(100)]);
        let mut row = store.load_active().await.unwrap().remove(0);
        row.active = false;
        store.upsert(row).await.unwrap();

        assert!(store.load_active().await.unwrap().is_empty());
        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_load_active_skips_inactive() {
        let mut done = btc(50);
        done.active = false;
        let store = MemoryTargetStore::with_targets(vec![btc(100), done]);
        let active = store.load_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].target, Decimal::from(100));
    }

    #[tokio::test]
    async fn test_duplicate_active_insert_rejected() {
        let store = MemoryTargetStore::with_targets(vec![btc(100)]);
        let err = store.upsert(btc(100)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_row() {
        let store = MemoryTargetStore::new();
        let mut row = btc(100);
        row.last_saved = crate::target::Baseline::Value(Decimal::ZERO);
        let err = store.upsert(row).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTarget(_)));
        assert!(store.snapshot().await.is_empty());
    }
}
