// Task domain module
// Units of work with a bounded status lifecycle

#![allow(clippy::module_inception)]

pub mod task;
pub mod value_objects;

pub use task::{Task, TaskDefinition, TaskStatusUpdate};
pub use value_objects::{TaskPriority, TaskStatus, TransitionError};
