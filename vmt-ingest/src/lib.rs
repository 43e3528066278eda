//! vmt-ingest library interface
//!
//! Turns scanner reports into deduplicated issues. Exposed as a library so
//! the binary and the integration tests drive the same code.

pub mod db;
pub mod extractor;
pub mod field_path;
pub mod logging;
pub mod notifier;
pub mod risk;
pub mod rules;
pub mod services;
pub mod store;

pub use db::SqliteStore;
pub use field_path::FieldPath;
pub use notifier::{EventBusNotifier, Notifier};
pub use services::{BatchCoordinator, BatchOutcome, TemplateService, UnitLocks};
pub use store::{IssueStore, ReportStore, TemplateStore};
