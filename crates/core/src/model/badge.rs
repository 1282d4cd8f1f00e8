use chrono::{DateTime, Utc};

use crate::model::ids::{BadgeId, ModuleId};

/// A durable achievement marker for a passed module quiz.
///
/// Awarding is idempotent: re-awarding an already-held badge changes
/// nothing and never produces a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeAward {
    pub module_id: ModuleId,
    pub badge_id: BadgeId,
    pub awarded_at: DateTime<Utc>,
}

impl BadgeAward {
    #[must_use]
    pub fn new(module_id: ModuleId, badge_id: BadgeId, awarded_at: DateTime<Utc>) -> Self {
        Self {
            module_id,
            badge_id,
            awarded_at,
        }
    }
}
