/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    /// Zero-based index of the question on screen.
    pub current_index: usize,
    /// Share of questions already passed, 0.0..=100.0.
    pub percent: f64,
    pub is_complete: bool,
}
