pub mod database;
pub mod error;
pub mod projects;
pub mod row_helpers;
pub mod schema;
pub mod tasks;

pub use database::Database;
pub use error::StoreError;
pub use projects::{ProjectRepo, ProjectRow};
pub use tasks::{PageRequest, SortField, SqliteTaskRepo, TaskRecord, TaskRepository};
