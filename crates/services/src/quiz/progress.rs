/// Aggregated view of quiz session progress, useful for UI.
///
/// `percent` is position-based — `(position + 1) / total` — not a count of
/// answered questions.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizProgress {
    pub total: usize,
    pub position: usize,
    pub answered: usize,
    pub percent: f64,
    pub is_complete: bool,
}
