use crate::database::pool::begin_write;
use crate::dto::attempt_dto::{
    AttemptReport, ExamResultRow, QuestionOutcome, ReportOption, ReportQuestion, ScoreResult,
};
use crate::dto::exam_dto::{QuestionWithOptions, StudentExamSummary};
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::attempt::{Attempt, Selections};
use crate::models::exam::Exam;
use crate::models::user::Role;
use crate::services::exam_service::{authorize_manage, fetch_exam, load_questions_with_options};
use crate::services::grading_service::{GradingService, ScorableQuestion};
use crate::services::user_service::{fetch_user, require_role};
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;

#[derive(Clone)]
pub struct AttemptService {
    pool: SqlitePool,
    allow_retakes: bool,
}

impl AttemptService {
    pub fn new(pool: SqlitePool, allow_retakes: bool) -> Self {
        Self {
            pool,
            allow_retakes,
        }
    }

    /// Scores a submission and records it as a new attempt.
    ///
    /// Every question of the exam is scored; unanswered questions and
    /// selections that name an option of another question count as
    /// incorrect. The attempt row and its per-question answers are written
    /// in one transaction.
    pub async fn submit_attempt(
        &self,
        student_id: i64,
        exam_id: i64,
        selections: Selections,
    ) -> Result<ScoreResult> {
        let mut tx = begin_write(&self.pool).await?;
        let exam = fetch_exam(&mut tx, exam_id).await?;
        let student = require_role(&mut tx, student_id, Role::Student).await?;

        let previous: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(attempt_number), 0) FROM attempts WHERE student_id = $1 AND exam_id = $2",
        )
        .bind(student.id)
        .bind(exam.id)
        .fetch_one(&mut *tx)
        .await?;
        if previous > 0 && !self.allow_retakes {
            return Err(Error::Validation(format!(
                "Exam {} has already been submitted",
                exam.id
            )));
        }
        let attempt_number = previous + 1;

        let questions = load_questions_with_options(&mut tx, exam.id).await?;
        let per_question = score(&questions, &selections);
        let (score, total) = GradingService::tally(&per_question);

        let attempt = sqlx::query_as::<_, Attempt>(
            r#"
            INSERT INTO attempts (student_id, exam_id, attempt_number, score, total, selections, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(student.id)
        .bind(exam.id)
        .bind(attempt_number)
        .bind(score)
        .bind(total)
        .bind(Json(selections))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for outcome in &per_question {
            sqlx::query(
                r#"
                INSERT INTO answers (attempt_id, student_id, exam_id, question_id, selected_option_id, is_correct)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(attempt.id)
            .bind(student.id)
            .bind(exam.id)
            .bind(outcome.question_id)
            .bind(outcome.selected_option_id)
            .bind(outcome.is_correct)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            attempt_id = attempt.id,
            student_id = student.id,
            exam_id = exam.id,
            attempt_number,
            score,
            total,
            "attempt submitted"
        );

        Ok(score_result(&attempt, per_question))
    }

    pub async fn get_attempt(&self, attempt_id: i64) -> Result<Attempt> {
        let mut conn = self.pool.acquire().await?;
        fetch_attempt(&mut conn, attempt_id).await
    }

    /// A student's attempts at one exam, newest first.
    pub async fn list_attempts(&self, student_id: i64, exam_id: i64) -> Result<Vec<Attempt>> {
        let attempts = sqlx::query_as::<_, Attempt>(
            r#"
            SELECT * FROM attempts
            WHERE student_id = $1 AND exam_id = $2
            ORDER BY attempt_number DESC
            "#,
        )
        .bind(student_id)
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    /// Every exam paired with the student's latest attempt at it.
    pub async fn latest_attempts_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<StudentExamSummary>> {
        let mut conn = self.pool.acquire().await?;
        let exams = sqlx::query_as::<_, Exam>("SELECT * FROM exams ORDER BY created_at DESC, id DESC")
            .fetch_all(&mut *conn)
            .await?;
        let latest = sqlx::query_as::<_, Attempt>(
            r#"
            SELECT a.* FROM attempts a
            WHERE a.student_id = $1
              AND a.attempt_number = (
                  SELECT MAX(b.attempt_number) FROM attempts b
                  WHERE b.student_id = a.student_id AND b.exam_id = a.exam_id
              )
            "#,
        )
        .bind(student_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut by_exam: HashMap<i64, Attempt> =
            latest.into_iter().map(|a| (a.exam_id, a)).collect();
        Ok(exams
            .into_iter()
            .map(|exam| StudentExamSummary {
                latest_attempt: by_exam.remove(&exam.id),
                exam,
            })
            .collect())
    }

    /// All attempts at an exam, for the teacher who manages it.
    pub async fn list_exam_results(
        &self,
        actor_id: i64,
        exam_id: i64,
    ) -> Result<(Exam, Vec<ExamResultRow>)> {
        let mut conn = self.pool.acquire().await?;
        let exam = fetch_exam(&mut conn, exam_id).await?;
        authorize_manage(&mut conn, actor_id, &exam).await?;

        let rows = sqlx::query_as::<_, ExamResultRow>(
            r#"
            SELECT
                a.id AS attempt_id,
                a.student_id,
                u.username AS student_name,
                a.attempt_number,
                a.score,
                a.total,
                a.submitted_at
            FROM attempts a
            JOIN users u ON u.id = a.student_id
            WHERE a.exam_id = $1
            ORDER BY a.submitted_at, a.id
            "#,
        )
        .bind(exam_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok((exam, rows))
    }

    /// Re-scores a stored attempt from its raw selections against the
    /// exam's current correct-option flags.
    pub async fn rederive_score(&self, attempt_id: i64) -> Result<ScoreResult> {
        let mut conn = self.pool.acquire().await?;
        let attempt = fetch_attempt(&mut conn, attempt_id).await?;
        let questions = load_questions_with_options(&mut conn, attempt.exam_id).await?;
        let per_question = score(&questions, &attempt.selections);
        let (score, total) = GradingService::tally(&per_question);
        if score != attempt.score || total != attempt.total {
            tracing::warn!(
                attempt_id,
                stored_score = attempt.score,
                stored_total = attempt.total,
                score,
                total,
                "re-derived score differs from the recorded one"
            );
        }

        let mut rederived = attempt;
        rederived.score = score;
        rederived.total = total;
        Ok(score_result(&rederived, per_question))
    }

    /// Report of one attempt for its student or a teacher managing the exam.
    pub async fn build_report(&self, viewer_id: i64, attempt_id: i64) -> Result<AttemptReport> {
        let mut conn = self.pool.acquire().await?;
        let attempt = fetch_attempt(&mut conn, attempt_id).await?;
        let exam = fetch_exam(&mut conn, attempt.exam_id).await?;
        if viewer_id != attempt.student_id {
            authorize_manage(&mut conn, viewer_id, &exam).await?;
        }
        let student = fetch_user(&mut conn, attempt.student_id).await?;

        let answers: HashMap<i64, Answer> = fetch_answers(&mut conn, attempt.id)
            .await?
            .into_iter()
            .map(|a| (a.question_id, a))
            .collect();

        let questions = load_questions_with_options(&mut conn, exam.id)
            .await?
            .into_iter()
            .map(|q| {
                let answer = answers.get(&q.question.id);
                let selected_option_id = answer.and_then(|a| a.selected_option_id);
                ReportQuestion {
                    question_id: q.question.id,
                    text: q.question.text,
                    options: q
                        .options
                        .into_iter()
                        .map(|o| ReportOption {
                            selected: selected_option_id == Some(o.id),
                            id: o.id,
                            text: o.text,
                            is_correct: o.is_correct,
                        })
                        .collect(),
                    selected_option_id,
                    is_correct: answer.map_or(false, |a| a.is_correct),
                }
            })
            .collect();

        Ok(AttemptReport {
            attempt_id: attempt.id,
            attempt_number: attempt.attempt_number,
            exam_id: exam.id,
            exam_title: exam.title,
            student_name: student.username,
            score: attempt.score,
            total: attempt.total,
            percentage: GradingService::percentage(attempt.score, attempt.total),
            grade: GradingService::grade(attempt.score, attempt.total),
            submitted_at: attempt.submitted_at,
            questions,
        })
    }
}

fn score(questions: &[QuestionWithOptions], selections: &Selections) -> Vec<QuestionOutcome> {
    let scorable: Vec<ScorableQuestion<'_>> = questions
        .iter()
        .map(|q| ScorableQuestion {
            question_id: q.question.id,
            options: &q.options,
        })
        .collect();
    GradingService::score_selections(&scorable, selections)
}

fn score_result(attempt: &Attempt, per_question: Vec<QuestionOutcome>) -> ScoreResult {
    ScoreResult {
        attempt_id: attempt.id,
        attempt_number: attempt.attempt_number,
        score: attempt.score,
        total: attempt.total,
        percentage: GradingService::percentage(attempt.score, attempt.total),
        grade: GradingService::grade(attempt.score, attempt.total),
        per_question,
    }
}

async fn fetch_answers(conn: &mut SqliteConnection, attempt_id: i64) -> Result<Vec<Answer>> {
    let answers = sqlx::query_as::<_, Answer>(
        "SELECT * FROM answers WHERE attempt_id = $1 ORDER BY question_id",
    )
    .bind(attempt_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(answers)
}

async fn fetch_attempt(conn: &mut SqliteConnection, attempt_id: i64) -> Result<Attempt> {
    sqlx::query_as::<_, Attempt>("SELECT * FROM attempts WHERE id = $1")
        .bind(attempt_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Attempt {} not found", attempt_id)))
}
