use crate::dto::attempt_dto::QuestionOutcome;
use crate::models::attempt::Selections;
use crate::models::question::AnswerOption;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Letter band derived from score/total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question together with its options, as the scorer sees it.
pub struct ScorableQuestion<'a> {
    pub question_id: i64,
    pub options: &'a [AnswerOption],
}

pub struct GradingService;

impl GradingService {
    /// Maps `score / total` to a letter. Thresholds are inclusive lower bounds
    /// on the percentage and are compared in integers, so 89/100 is a B.
    pub fn grade(score: i64, total: i64) -> Grade {
        if total == 0 {
            return Grade::NotApplicable;
        }
        let scaled = score * 100;
        if scaled >= 90 * total {
            Grade::A
        } else if scaled >= 80 * total {
            Grade::B
        } else if scaled >= 70 * total {
            Grade::C
        } else if scaled >= 60 * total {
            Grade::D
        } else {
            Grade::E
        }
    }

    pub fn percentage(score: i64, total: i64) -> f64 {
        if total == 0 {
            0.0
        } else {
            (score as f64 / total as f64) * 100.0
        }
    }

    /// Correct option of a question: the lowest-id flagged option.
    /// Anything other than exactly one flag is logged.
    pub fn correct_option_id(question_id: i64, options: &[AnswerOption]) -> Option<i64> {
        let flagged: Vec<i64> = options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.id)
            .collect();

        match flagged.len() {
            1 => Some(flagged[0]),
            0 => {
                tracing::warn!(question_id, "question has no option flagged correct");
                None
            }
            n => {
                let chosen = flagged.iter().copied().min();
                tracing::warn!(
                    question_id,
                    flagged = n,
                    chosen = ?chosen,
                    "question has several options flagged correct, using the lowest id"
                );
                chosen
            }
        }
    }

    /// Scores every question against the submitted selections.
    ///
    /// A question is correct iff the selected id is its correct option's id.
    /// Missing selections and selections naming an option of some other
    /// question count as incorrect; the latter is reported with
    /// `selected_option_id = None` so it is never persisted against the
    /// wrong question.
    pub fn score_selections(
        questions: &[ScorableQuestion<'_>],
        selections: &Selections,
    ) -> Vec<QuestionOutcome> {
        for question_id in selections.keys() {
            if !questions.iter().any(|q| q.question_id == *question_id) {
                tracing::warn!(question_id, "selection for a question outside the exam ignored");
            }
        }

        questions
            .iter()
            .map(|q| {
                let correct_option_id = Self::correct_option_id(q.question_id, q.options);
                let submitted = selections.get(&q.question_id).copied().flatten();

                let selected_option_id = match submitted {
                    Some(option_id) if q.options.iter().any(|o| o.id == option_id) => Some(option_id),
                    Some(option_id) => {
                        tracing::warn!(
                            question_id = q.question_id,
                            option_id,
                            "selected option does not belong to the question"
                        );
                        None
                    }
                    None => None,
                };

                let is_correct = match (selected_option_id, correct_option_id) {
                    (Some(selected), Some(correct)) => selected == correct,
                    _ => false,
                };

                QuestionOutcome {
                    question_id: q.question_id,
                    selected_option_id,
                    correct_option_id,
                    is_correct,
                }
            })
            .collect()
    }

    pub fn tally(outcomes: &[QuestionOutcome]) -> (i64, i64) {
        let score = outcomes.iter().filter(|o| o.is_correct).count() as i64;
        (score, outcomes.len() as i64)
    }
}
