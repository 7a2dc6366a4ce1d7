//! # wareflow-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the storage port traits defined in `wareflow-app::ports`
//! - Manage the `SQLite` connection pool lifecycle
//! - Run database migrations (sqlx embedded migrations)
//! - Map between domain types and database rows
//! - Provide the atomic job claim the scheduler's correctness rests on
//!
//! ## Dependency rule
//! Depends on `wareflow-app` (for port traits) and `wareflow-domain` (for
//! domain types). The `app` and `domain` crates must never reference this
//! adapter.

mod entity_records;
mod error;
mod execution_repo;
mod job_repo;
mod pool;
mod rule_repo;
mod template_repo;

pub use entity_records::SqliteEntityCommands;
pub use error::StorageError;
pub use execution_repo::SqliteExecutionStore;
pub use job_repo::SqliteJobRepository;
pub use pool::{Config, Database};
pub use rule_repo::SqliteRuleRepository;
pub use template_repo::SqliteTemplateRepository;
