pub mod log;
pub mod telegram;

pub use self::log::LogNotifier;
pub use telegram::TelegramNotifier;

use crate::error::NotifyError;
use crate::target::Target;
use async_trait::async_trait;

/// Delivers one alert per triggered target.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, target: &Target) -> Result<(), NotifyError>;

    async fn close(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}
