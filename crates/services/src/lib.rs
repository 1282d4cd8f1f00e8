#![forbid(unsafe_code)]

pub mod error;
pub mod quiz;

pub use course_core::Clock;

pub use error::{ProgressError, QuizSessionError};

pub use quiz::{
    AttemptId, AttemptListItem, ModuleProgress, ProgressService, QuizAdvance, QuizLoopService,
    QuizOutcome, QuizProgress, QuizSession,
};
