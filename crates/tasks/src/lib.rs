//! Tasks domain module.

pub mod task;

pub use task::{
    NewTaskInput, Task, TaskDraft, TaskFilter, TaskPatch, TaskPatchInput, TaskStatus,
    UnknownStatus,
};
