//! Error types for targets, collaborators and the pipeline.
//!
//! Per-item collaborator errors (`StoreError` from `upsert`, `SourceError`,
//! `NotifyError`) are logged by the worker that hit them and never leave it.
//! Only a failed initial load surfaces from `Pipeline::run`.

use rust_decimal::Decimal;
use thiserror::Error;

/// Invariant violations on a `Target`.
#[derive(Debug, Error, PartialEq)]
pub enum TargetError {
    #[error("target must be > 0, got {0}")]
    NonPositiveTarget(Decimal),

    #[error("last saved value must be > 0, got {0}")]
    NonPositiveBaseline(Decimal),

    #[error("unknown direction: {0:?}")]
    UnknownDirection(String),
}

/// Target storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connectivity or I/O failure.
    #[error("target store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded.
    #[error("target store corrupt: {0}")]
    Corrupt(String),

    /// The write would break a storage rule (e.g. duplicate active target).
    #[error("invalid target: {0}")]
    InvalidTarget(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Value source errors.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("value source unavailable: {0}")]
    Unavailable(String),

    /// The source asked us to slow down. Not retried within a run.
    #[error("value source rate limited request for {0}")]
    RateLimited(String),

    #[error("could not parse value for {key}: {reason}")]
    Parse { key: String, reason: String },
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Unavailable(e.to_string())
    }
}

/// Notification delivery errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::DeliveryFailed(e.to_string())
    }
}

/// Errors that abort a whole pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("loading active targets failed: {0}")]
    Load(#[source] StoreError),

    #[error("invalid pipeline config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Unavailable("connection refused".into());
        assert!(err.to_string().contains("connection refused"));

        let err = SourceError::RateLimited("bitcoin".into());
        assert!(err.to_string().contains("rate limited"));
        assert!(err.to_string().contains("bitcoin"));

        let err = SourceError::Parse { key: "bitcoin".into(), reason: "missing usd".into() };
        assert!(err.to_string().contains("missing usd"));

        let err = NotifyError::DeliveryFailed("403".into());
        assert!(err.to_string().contains("403"));

        let err = PipelineError::Load(StoreError::Unavailable("down".into()));
        assert!(err.to_string().contains("down"));
    }

    #[test]
    fn test_io_error_maps_to_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(StoreError::from(io), StoreError::Unavailable(_)));
    }
}
