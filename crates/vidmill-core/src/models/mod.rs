//! Domain models.

pub mod operation;

pub use operation::{Operation, OperationError, RawOperationParams};
