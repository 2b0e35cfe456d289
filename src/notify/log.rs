use super::Notifier;
use crate::error::NotifyError;
use crate::target::Target;
use async_trait::async_trait;

/// Writes alerts to the log instead of delivering them anywhere.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, target: &Target) -> Result<(), NotifyError> {
        tracing::info!(
            id = ?target.id,
            symbol = %target.symbol,
            direction = %target.direction,
            "ALERT: {}",
            target.alert_message()
        );
        Ok(())
    }
}
