use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use course_core::model::{
    AttemptError, AttemptRecord, BadgeId, CourseModule, ModuleId, Question, QuestionId, Quiz,
    percentage_score,
};

use super::progress::QuizProgress;

//
// ─── QUIZ SESSION ──────────────────────────────────────────────────────────────
//

/// In-memory state machine for one pass through a module quiz.
///
/// Steps through the questions in authored order: select an answer, submit
/// it to reveal the explanation, then advance. Advancing past the final
/// question completes the session and fixes the score. All interactive
/// mutation after completion is disabled until an explicit `retry`.
///
/// Every operation is a defensive no-op outside its precondition and
/// returns whether state changed; the UI gates controls, but the machine
/// tolerates being called anyway. Persistence is orchestrated separately
/// by `QuizLoopService`.
pub struct QuizSession {
    module_id: ModuleId,
    badge: Option<BadgeId>,
    passing_score: u8,
    quiz: Quiz,
    current: usize,
    // Sparse: absence means "unanswered", which is distinct from option 0.
    selected: HashMap<usize, usize>,
    explanation_visible: bool,
    completed_at: Option<DateTime<Utc>>,
    score: Option<u8>,
    // Historical best before this attempt; baseline for is_new_best.
    best_before: u8,
    // Best including the just-recorded attempt, for display.
    best_known: u8,
    started_at: DateTime<Utc>,
    attempt_id: Option<i64>,
}

impl QuizSession {
    /// Create a session at question 0 with a clean answer map.
    ///
    /// `best_score` is the highest persisted score for this module so far
    /// (0 if none); `started_at` should come from the services layer clock
    /// to keep time deterministic.
    #[must_use]
    pub fn new(
        module: &CourseModule,
        quiz: Quiz,
        best_score: u8,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            module_id: module.id().clone(),
            badge: module.badge().cloned(),
            passing_score: module.settings().passing_score(),
            quiz,
            current: 0,
            selected: HashMap::new(),
            explanation_visible: false,
            completed_at: None,
            score: None,
            best_before: best_score,
            best_known: best_score,
            started_at,
            attempt_id: None,
        }
    }

    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    #[must_use]
    pub fn badge(&self) -> Option<&BadgeId> {
        self.badge.as_ref()
    }

    #[must_use]
    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.quiz.total_questions()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The question at the current index.
    ///
    /// # Panics
    ///
    /// Never panics: `current` stays within `[0, total_questions)`.
    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.quiz.questions()[self.current]
    }

    /// The chosen option for the current question, if any.
    #[must_use]
    pub fn selected_answer(&self) -> Option<usize> {
        self.selected.get(&self.current).copied()
    }

    /// The chosen option for the question at `index`, if any.
    #[must_use]
    pub fn answer_at(&self, index: usize) -> Option<usize> {
        self.selected.get(&index).copied()
    }

    #[must_use]
    pub fn explanation_visible(&self) -> bool {
        self.explanation_visible
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// The final score; present only once the session completes.
    #[must_use]
    pub fn score(&self) -> Option<u8> {
        self.score
    }

    #[must_use]
    pub fn passed(&self) -> Option<bool> {
        self.score.map(|s| s >= self.passing_score)
    }

    /// Storage id of the recorded attempt; `None` until the workflow
    /// persists it (or when persistence failed — "progress not saved").
    #[must_use]
    pub fn attempt_id(&self) -> Option<i64> {
        self.attempt_id
    }

    /// Best persisted score known for this module, including the attempt
    /// just recorded once the workflow refreshes it.
    #[must_use]
    pub fn best_score(&self) -> u8 {
        self.best_known
    }

    /// Whether this attempt beat the historical best as it was before the
    /// attempt was recorded. Strictly greater: tying the best is not new.
    #[must_use]
    pub fn is_new_best(&self) -> Option<bool> {
        self.score.map(|s| s > self.best_before)
    }

    /// Position-based progress through the quiz, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> f64 {
        (self.current + 1) as f64 / self.total_questions() as f64 * 100.0
    }

    /// Returns a snapshot of the current session progress.
    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        QuizProgress {
            total: self.total_questions(),
            position: self.current,
            answered: self.selected.len(),
            percent: self.progress_percent(),
            is_complete: self.is_complete(),
        }
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Choose an option for the current question, overwriting any earlier
    /// choice. No-op once the explanation is showing (the answer is locked
    /// after submission), after completion, or for an out-of-range option.
    pub fn select_answer(&mut self, option: usize) -> bool {
        if self.is_complete() || self.explanation_visible {
            return false;
        }
        if option >= self.current_question().option_count() {
            return false;
        }
        self.selected.insert(self.current, option);
        true
    }

    /// Submit the chosen answer, revealing the explanation and the
    /// correct/incorrect highlighting. No-op while nothing is selected.
    pub fn submit_answer(&mut self) -> bool {
        if self.is_complete() || self.explanation_visible {
            return false;
        }
        if self.selected_answer().is_none() {
            return false;
        }
        self.explanation_visible = true;
        true
    }

    /// Advance to the next question, or finish the quiz when on the last
    /// one. Requires the current question to have been submitted.
    ///
    /// `now` becomes the completion timestamp when this call finishes the
    /// quiz; it should come from the services layer clock.
    pub fn next_question(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_complete() || !self.explanation_visible {
            return false;
        }
        if self.current + 1 < self.total_questions() {
            self.current += 1;
            self.explanation_visible = false;
        } else {
            self.finish(now);
        }
        true
    }

    /// Step back one question. Allowed whenever there is a previous
    /// question, regardless of the current question's sub-state; the
    /// explanation flag resets but stored answers stay intact.
    pub fn previous_question(&mut self) -> bool {
        if self.is_complete() || self.current == 0 {
            return false;
        }
        self.current -= 1;
        self.explanation_visible = false;
        true
    }

    /// Start a fresh attempt after completion: question 0, cleared answer
    /// map, no score. Persisted history is untouched; the best-score
    /// baseline advances to include the attempt just taken.
    pub fn retry(&mut self) -> bool {
        if !self.is_complete() {
            return false;
        }
        self.current = 0;
        self.selected.clear();
        self.explanation_visible = false;
        self.completed_at = None;
        self.score = None;
        self.attempt_id = None;
        self.best_before = self.best_known;
        true
    }

    fn finish(&mut self, now: DateTime<Utc>) {
        let total = u32::try_from(self.total_questions()).unwrap_or(u32::MAX);
        self.score = Some(percentage_score(self.correct_count(), total));
        self.completed_at = Some(now);
    }

    //
    // ─── SCORING ───────────────────────────────────────────────────────────────
    //

    /// Questions answered with the correct option. Unanswered questions
    /// never count.
    #[must_use]
    pub fn correct_count(&self) -> u32 {
        let count = self
            .quiz
            .questions()
            .iter()
            .enumerate()
            .filter(|(index, question)| self.selected.get(index) == Some(&question.correct_answer()))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Answer map keyed by question id, applying the positional fallback
    /// for questions authored without one.
    #[must_use]
    pub fn answers_by_key(&self) -> BTreeMap<QuestionId, usize> {
        self.selected
            .iter()
            .map(|(index, answer)| (self.quiz.question_key(*index), *answer))
            .collect()
    }

    /// Build the immutable record for this finished attempt.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the counts are inconsistent.
    pub fn build_attempt(
        &self,
        completed_at: DateTime<Utc>,
    ) -> Result<AttemptRecord, AttemptError> {
        AttemptRecord::new(
            self.module_id.clone(),
            self.answers_by_key(),
            self.correct_count(),
            u32::try_from(self.total_questions()).unwrap_or(u32::MAX),
            self.passing_score,
            completed_at,
        )
    }

    pub(crate) fn set_attempt_id(&mut self, id: i64) {
        self.attempt_id = Some(id);
    }

    pub(crate) fn set_best_score(&mut self, best: u8) {
        self.best_known = best;
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("module_id", &self.module_id)
            .field("total_questions", &self.quiz.total_questions())
            .field("current", &self.current)
            .field("answered", &self.selected.len())
            .field("explanation_visible", &self.explanation_visible)
            .field("completed_at", &self.completed_at)
            .field("score", &self.score)
            .field("attempt_id", &self.attempt_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{CourseModule, QuizSettings};
    use course_core::time::fixed_now;

    fn build_quiz(correct: &[usize]) -> Quiz {
        let questions = correct
            .iter()
            .enumerate()
            .map(|(i, answer)| {
                Question::new(
                    None,
                    format!("Question {i}"),
                    (0..4).map(|o| format!("option {o}")).collect(),
                    *answer,
                    Some(format!("Explanation {i}")),
                )
                .unwrap()
            })
            .collect();
        Quiz::new(questions).unwrap()
    }

    fn build_module(badge: Option<&str>) -> CourseModule {
        CourseModule::new(
            ModuleId::new("oauth2-fundamentals"),
            "OAuth2 Fundamentals",
            badge.map(BadgeId::new),
            QuizSettings::default(),
        )
        .unwrap()
    }

    fn session(correct: &[usize]) -> QuizSession {
        QuizSession::new(&build_module(None), build_quiz(correct), 0, fixed_now())
    }

    fn answer_and_advance(session: &mut QuizSession, option: usize) {
        assert!(session.select_answer(option));
        assert!(session.submit_answer());
        assert!(session.next_question(fixed_now()));
    }

    #[test]
    fn reselecting_before_submit_keeps_last_choice() {
        let mut s = session(&[0, 1]);
        assert!(s.select_answer(2));
        assert!(s.select_answer(0));
        assert!(s.select_answer(3));
        assert_eq!(s.selected_answer(), Some(3));
    }

    #[test]
    fn answer_is_locked_once_explanation_is_shown() {
        let mut s = session(&[0, 1]);
        assert!(s.select_answer(1));
        assert!(s.submit_answer());
        assert!(!s.select_answer(0));
        assert_eq!(s.selected_answer(), Some(1));
    }

    #[test]
    fn submit_without_selection_is_a_noop() {
        let mut s = session(&[0, 1]);
        assert!(!s.submit_answer());
        assert!(!s.explanation_visible());
        // Option 0 counts as answered; absence is the only "unanswered".
        assert!(s.select_answer(0));
        assert!(s.submit_answer());
    }

    #[test]
    fn advance_requires_submission() {
        let mut s = session(&[0, 1]);
        assert!(!s.next_question(fixed_now()));
        s.select_answer(0);
        assert!(!s.next_question(fixed_now()));
        s.submit_answer();
        assert!(s.next_question(fixed_now()));
        assert_eq!(s.current_index(), 1);
        assert!(!s.explanation_visible());
    }

    #[test]
    fn out_of_range_selection_is_rejected() {
        let mut s = session(&[0, 1]);
        assert!(!s.select_answer(4));
        assert_eq!(s.selected_answer(), None);
    }

    #[test]
    fn previous_resets_explanation_but_keeps_answers() {
        let mut s = session(&[0, 1, 2]);
        answer_and_advance(&mut s, 0);
        assert!(s.previous_question());
        // Back on question 0: stored answer intact, explanation hidden.
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.selected_answer(), Some(0));
        assert!(!s.explanation_visible());
    }

    #[test]
    fn previous_at_first_question_is_a_noop() {
        let mut s = session(&[0, 1]);
        assert!(!s.previous_question());
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn full_run_scores_and_completes() {
        // Four of five correct: 80, passed at the default threshold.
        let mut s = session(&[0, 1, 0, 0, 3]);
        for answer in [0, 1, 2, 0, 3] {
            answer_and_advance(&mut s, answer);
        }

        assert!(s.is_complete());
        assert_eq!(s.correct_count(), 4);
        assert_eq!(s.score(), Some(80));
        assert_eq!(s.passed(), Some(true));
        assert_eq!(s.completed_at(), Some(fixed_now()));
        // Interactions are disabled after completion.
        assert!(!s.select_answer(0));
        assert!(!s.submit_answer());
        assert!(!s.next_question(fixed_now()));
        assert!(!s.previous_question());
    }

    #[test]
    fn failing_run_scores_below_threshold() {
        let mut s = session(&[0, 1, 0, 0, 3]);
        for answer in [0, 1, 2, 2, 3] {
            answer_and_advance(&mut s, answer);
        }
        assert_eq!(s.score(), Some(60));
        assert_eq!(s.passed(), Some(false));
    }

    #[test]
    fn progress_is_position_based_and_monotonic() {
        let mut s = session(&[0, 1, 0]);
        let mut last = 0.0;
        for answer in [0, 1, 0] {
            let percent = s.progress_percent();
            assert!(percent > last);
            last = percent;
            answer_and_advance(&mut s, answer);
        }
        assert!((s.progress_percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn retry_resets_the_attempt_state() {
        let mut s = session(&[0, 1]);
        assert!(!s.retry());
        answer_and_advance(&mut s, 0);
        answer_and_advance(&mut s, 1);
        assert!(s.is_complete());

        assert!(s.retry());
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.selected_answer(), None);
        assert_eq!(s.answer_at(1), None);
        assert!(!s.is_complete());
        assert_eq!(s.score(), None);
        assert!(!s.explanation_visible());
    }

    #[test]
    fn new_best_is_strictly_greater() {
        let module = build_module(None);

        let mut beaten = QuizSession::new(&module, build_quiz(&[0, 1, 0, 0]), 70, fixed_now());
        for answer in [0, 1, 0, 2] {
            answer_and_advance(&mut beaten, answer);
        }
        assert_eq!(beaten.score(), Some(75));
        assert_eq!(beaten.is_new_best(), Some(true));

        let mut tied = QuizSession::new(&module, build_quiz(&[0, 1, 0, 0]), 75, fixed_now());
        for answer in [0, 1, 0, 2] {
            answer_and_advance(&mut tied, answer);
        }
        assert_eq!(tied.score(), Some(75));
        assert_eq!(tied.is_new_best(), Some(false));
    }

    #[test]
    fn attempt_answers_use_the_positional_fallback() {
        let questions = vec![
            Question::new(
                Some(QuestionId::new("authn-vs-authz")),
                "Authentication is…",
                vec!["who you are".into(), "what you may do".into()],
                0,
                None,
            )
            .unwrap(),
            Question::new(
                None,
                "Authorization is…",
                vec!["who you are".into(), "what you may do".into()],
                1,
                None,
            )
            .unwrap(),
            Question::new(
                None,
                "Zanzibar models permissions as…",
                vec!["relations".into(), "roles".into()],
                0,
                None,
            )
            .unwrap(),
        ];
        let mut s = QuizSession::new(
            &build_module(None),
            Quiz::new(questions).unwrap(),
            0,
            fixed_now(),
        );
        for answer in [0, 1, 0] {
            answer_and_advance(&mut s, answer);
        }

        let record = s.build_attempt(fixed_now()).unwrap();
        assert_eq!(record.answers().get(&QuestionId::new("authn-vs-authz")), Some(&0));
        assert_eq!(record.answers().get(&QuestionId::positional(1)), Some(&1));
        assert_eq!(record.answers().get(&QuestionId::positional(2)), Some(&0));
        assert_eq!(record.score(), 100);
    }
}
