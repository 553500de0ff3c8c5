use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-question response row belonging to one attempt.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Answer {
    pub id: i64,
    pub attempt_id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub question_id: i64,
    /// Only ever an option of `question_id`; `None` means unanswered or invalid.
    pub selected_option_id: Option<i64>,
    pub is_correct: bool,
}
