pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryTargetStore;

use crate::error::StoreError;
use crate::target::Target;
use async_trait::async_trait;

#[async_trait]
pub trait TargetStore: Send + Sync {
    /// All active targets, in `order_for_evaluation` order.
    async fn load_active(&self) -> Result<Vec<Target>, StoreError>;

    /// Inserts when `id` is unset, otherwise updates the stored row with the
    /// same id. Each call is self-contained and safe to run concurrently.
    async fn upsert(&self, target: Target) -> Result<Target, StoreError>;

    /// Releases any held resources. Called once at the end of a run.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Never-updated targets first, then by ascending distance between
/// `target` and `last_saved`, so the ones closest to firing go out first.
pub fn order_for_evaluation(targets: &mut [Target]) {
    targets.sort_by(|a, b| {
        a.updated_at
            .is_some()
            .cmp(&b.updated_at.is_some())
            .then_with(|| a.distance_to_target().cmp(&b.distance_to_target()))
    });
}

/// Rejects a write that would leave two active targets on the same
/// (symbol, target) pair. Only a matching `Some` id marks the same row; two
/// unsaved targets are still two rows.
pub(crate) fn check_unique_active(existing: &[Target], candidate: &Target) -> Result<(), StoreError> {
    if !candidate.active {
        return Ok(());
    }
    let clash = existing.iter().any(|t| {
        let same_row = t.id.is_some() && t.id == candidate.id;
        t.active
            && !same_row
            && t.symbol == candidate.symbol
            && t.target == candidate.target
    });
    if clash {
        return Err(StoreError::InvalidTarget(format!(
            "an active target already exists for {} at {}",
            candidate.symbol, candidate.target
        )));
    }
    Ok(())
}

/// Runs `Target::validate` on a row about to be written.
pub(crate) fn check_valid(candidate: &Target) -> Result<(), StoreError> {
    candidate
        .validate()
        .map_err(|e| StoreError::InvalidTarget(format!("{}: {}", candidate.symbol, e)))
}
