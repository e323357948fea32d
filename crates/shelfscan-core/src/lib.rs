pub mod audit_log;
pub mod classify;
pub mod config;
pub mod error;
pub mod file_ops;
pub mod models;
pub mod normalize;
pub mod storage;

pub use audit_log::{AuditLog, LogStatus};
pub use classify::Classifier;
pub use config::{AppConfig, PathsConfig, ScanConfig, ShelvingConfig, SourcesConfig};
pub use error::{ExitCode, Result, ShelfError};
pub use models::*;
pub use storage::{LibraryStore, LookupTable};
