pub mod http;

pub use http::HttpValueSource;

use crate::error::SourceError;
use crate::target::Target;
use async_trait::async_trait;
use rust_decimal::Decimal;

#[async_trait]
pub trait ValueSource: Send + Sync {
    /// Current value for `target.source_key`. The caller stores it in
    /// `target.current`; on error the target is left as it was.
    async fn fetch(&self, target: &Target) -> Result<Decimal, SourceError>;

    async fn close(&self) -> Result<(), SourceError> {
        Ok(())
    }
}
