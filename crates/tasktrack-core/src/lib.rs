//! Domain types shared by every tasktrack crate: identifiers, task status,
//! the transfer shape exchanged over HTTP, and field validation.

pub mod dto;
pub mod ids;
pub mod status;
pub mod validation;

pub use dto::{BatchStatusUpdate, TaskDto, TaskInput};
pub use ids::{ProjectId, TaskId};
pub use status::TaskStatus;
pub use validation::FieldError;
