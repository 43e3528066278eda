//! Ingest services
//!
//! Matching, merging and batch orchestration, plus the template service
//! that drives them from stored reports.

pub mod batch_coordinator;
pub mod issue_matcher;
pub mod issue_merger;
pub mod issue_pool;
pub mod template_service;
pub mod unit_locks;

pub use batch_coordinator::{BatchCoordinator, BatchOutcome};
pub use issue_matcher::{classify, MatchOutcome};
pub use issue_merger::merge_record;
pub use issue_pool::{IssuePool, PooledIssue};
pub use template_service::TemplateService;
pub use unit_locks::UnitLocks;
