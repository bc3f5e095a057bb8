mod plan;
mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{PlanBuilder, SessionPlan};
pub use progress::SessionProgress;
pub use service::{
    AnswerView, SavedResult, SessionContext, SessionMode, SessionOutcome, TestSession,
};
pub use workflow::{SNAPSHOT_KEY_PREFIX, SessionRequest, TestLoopService};
