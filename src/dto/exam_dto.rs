use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::attempt::Attempt;
use crate::models::exam::Exam;
use crate::models::question::{AnswerOption, Question};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateExamPayload {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateExamPayload {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OptionPayload {
    #[validate(length(min = 1, max = 255))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    #[validate(length(min = 1, max = 255))]
    pub text: String,
    pub options: Vec<OptionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCorrectOptionRequest {
    pub option_id: i64,
}

/// Question with its options, correctness included (authoring view).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<AnswerOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamDetail {
    #[serde(flatten)]
    pub exam: Exam,
    pub questions: Vec<QuestionWithOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<PublicOption>,
}

/// Exam as shown to a student taking it: no correctness flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicExam {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<PublicQuestion>,
}

impl From<ExamDetail> for PublicExam {
    fn from(detail: ExamDetail) -> Self {
        Self {
            id: detail.exam.id,
            title: detail.exam.title,
            description: detail.exam.description,
            questions: detail
                .questions
                .into_iter()
                .map(|q| PublicQuestion {
                    id: q.question.id,
                    text: q.question.text,
                    options: q
                        .options
                        .into_iter()
                        .map(|o| PublicOption { id: o.id, text: o.text })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Dashboard row for a student: exam plus their most recent attempt, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentExamSummary {
    #[serde(flatten)]
    pub exam: Exam,
    pub latest_attempt: Option<Attempt>,
}
