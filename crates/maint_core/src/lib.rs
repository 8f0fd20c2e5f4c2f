pub mod config;
pub mod error;
pub mod logging;

pub use config::ExportConfig;
pub use error::{ClassifiedError, ErrorCategory, ReportError, classify_error};
