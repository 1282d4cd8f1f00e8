mod progress;
mod session;
mod view;
mod workflow;

// Public API of the quiz subsystem.
pub use crate::error::{ProgressError, QuizSessionError};
pub use progress::QuizProgress;
pub use session::QuizSession;
pub use view::{AttemptId, AttemptListItem, ModuleProgress, ProgressService};
pub use workflow::{QuizAdvance, QuizLoopService, QuizOutcome};
