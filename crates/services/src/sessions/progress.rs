/// Aggregated view of session progress, useful for front-ends.
///
/// `completed` counts answered cards, so it starts at 0 and reaches `total`
/// only when the session is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
    pub is_complete: bool,
}
