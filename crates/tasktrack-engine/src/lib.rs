pub mod error;
pub mod mapper;
pub mod service;

pub use error::ServiceError;
pub use service::{ListParams, TaskService, DEFAULT_PAGE_SIZE};
