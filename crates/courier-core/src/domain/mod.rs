//! Domain model (keys, tasks, platforms, outcomes, errors).

pub mod errors;
pub mod ids;
pub mod outcome;
pub mod platform;
pub mod task;

pub use errors::{ErrorKind, ExecutionError, ValidationError};
pub use ids::TaskKey;
pub use outcome::{OutcomeKind, TaskOutcome};
pub use platform::Platform;
pub use task::{ScheduledTask, TaskPayload};
