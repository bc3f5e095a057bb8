/// Aggregated view of session progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub skipped: usize,
    /// Display index of the current question.
    pub current: usize,
    pub is_complete: bool,
}
