use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::attempt::Selections;
use crate::services::grading_service::Grade;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAttemptRequest {
    /// Question id -> selected option id; omitted or `null` means unanswered.
    #[serde(default)]
    pub selections: Selections,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
    pub correct_option_id: Option<i64>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub attempt_id: i64,
    pub attempt_number: i64,
    pub score: i64,
    pub total: i64,
    pub percentage: f64,
    pub grade: Grade,
    pub per_question: Vec<QuestionOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOption {
    pub id: i64,
    pub text: String,
    pub is_correct: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportQuestion {
    pub question_id: i64,
    pub text: String,
    pub options: Vec<ReportOption>,
    pub selected_option_id: Option<i64>,
    pub is_correct: bool,
}

/// Everything a renderer needs to present one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    pub attempt_id: i64,
    pub attempt_number: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub student_name: String,
    pub score: i64,
    pub total: i64,
    pub percentage: f64,
    pub grade: Grade,
    pub submitted_at: DateTime<Utc>,
    pub questions: Vec<ReportQuestion>,
}

/// One attempt in an exam's result list.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExamResultRow {
    pub attempt_id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub attempt_number: i64,
    pub score: i64,
    pub total: i64,
    pub submitted_at: DateTime<Utc>,
}
