pub mod config;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod target;

pub use error::{NotifyError, PipelineError, SourceError, StoreError, TargetError};
pub use pipeline::{Pipeline, PipelineConfig, RunSummary};
pub use target::{Baseline, Direction, Target};
