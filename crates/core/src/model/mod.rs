mod attempt;
mod badge;
mod ids;
mod module;
mod question;
mod quiz;

pub use ids::{BadgeId, ModuleId, QuestionId};

pub use attempt::{AttemptError, AttemptRecord, percentage_score};
pub use badge::BadgeAward;
pub use module::{CourseModule, ModuleError, PASSING_SCORE, QuizSettings};
pub use question::{Question, QuestionDraft, QuestionError};
pub use quiz::{Quiz, QuizDraft, QuizError};
