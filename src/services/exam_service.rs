use crate::database::pool::begin_write;
use crate::dto::exam_dto::{
    CreateExamPayload, CreateQuestionPayload, ExamDetail, OptionPayload, QuestionWithOptions,
    UpdateExamPayload,
};
use crate::error::{Error, Result};
use crate::models::exam::Exam;
use crate::models::question::{AnswerOption, Question};
use crate::models::user::{Role, User};
use crate::services::user_service::require_role;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use validator::Validate;

#[derive(Clone)]
pub struct ExamService {
    pool: SqlitePool,
}

impl ExamService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_exam(&self, actor_id: i64, payload: CreateExamPayload) -> Result<Exam> {
        payload.validate()?;
        let title = non_blank("title", &payload.title)?;
        let description = payload.description.as_deref().and_then(optional_text);

        let mut tx = begin_write(&self.pool).await?;
        let author = require_role(&mut tx, actor_id, Role::Teacher).await?;

        let exam = sqlx::query_as::<_, Exam>(
            r#"
            INSERT INTO exams (title, description, author_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(author.id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(exam_id = exam.id, author_id = author.id, "created exam '{}'", exam.title);
        Ok(exam)
    }

    pub async fn get_exam(&self, exam_id: i64) -> Result<Exam> {
        let mut conn = self.pool.acquire().await?;
        fetch_exam(&mut conn, exam_id).await
    }

    pub async fn list_exams(&self) -> Result<Vec<Exam>> {
        let exams = sqlx::query_as::<_, Exam>("SELECT * FROM exams ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(exams)
    }

    pub async fn list_exams_by_author(&self, author_id: i64) -> Result<Vec<Exam>> {
        let exams = sqlx::query_as::<_, Exam>(
            "SELECT * FROM exams WHERE author_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    pub async fn update_exam(
        &self,
        actor_id: i64,
        exam_id: i64,
        payload: UpdateExamPayload,
    ) -> Result<Exam> {
        payload.validate()?;
        let title = match payload.title.as_deref() {
            Some(title) => Some(non_blank("title", title)?),
            None => None,
        };

        let mut tx = begin_write(&self.pool).await?;
        let exam = fetch_exam(&mut tx, exam_id).await?;
        authorize_manage(&mut tx, actor_id, &exam).await?;

        let updated = sqlx::query_as::<_, Exam>(
            r#"
            UPDATE exams
            SET title = COALESCE($1, title),
                description = CASE WHEN $2 THEN $3 ELSE description END
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(payload.description.is_some())
        .bind(payload.description.as_deref().and_then(optional_text))
        .bind(exam_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Deletes an exam with every question, option, attempt and answer under it.
    /// Children go first, all in one transaction.
    pub async fn delete_exam(&self, actor_id: i64, exam_id: i64) -> Result<bool> {
        let mut tx = begin_write(&self.pool).await?;
        let exam = match fetch_exam(&mut tx, exam_id).await {
            Ok(exam) => exam,
            Err(Error::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        authorize_manage(&mut tx, actor_id, &exam).await?;

        let question_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM questions WHERE exam_id = $1")
            .bind(exam_id)
            .fetch_all(&mut *tx)
            .await?;

        let answers = sqlx::query("DELETE FROM answers WHERE exam_id = $1")
            .bind(exam_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let answers = answers + delete_where_in(&mut tx, "answers", "question_id", &question_ids).await?;
        let options = delete_where_in(&mut tx, "options", "question_id", &question_ids).await?;
        let questions = delete_where_in(&mut tx, "questions", "id", &question_ids).await?;
        let attempts = sqlx::query("DELETE FROM attempts WHERE exam_id = $1")
            .bind(exam_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(exam_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(
            exam_id,
            questions,
            options,
            attempts,
            answers,
            "deleted exam with dependents"
        );
        Ok(true)
    }

    /// Exam with questions and their options in authoring order.
    pub async fn get_exam_detail(&self, exam_id: i64) -> Result<ExamDetail> {
        let mut conn = self.pool.acquire().await?;
        let exam = fetch_exam(&mut conn, exam_id).await?;
        let questions = load_questions_with_options(&mut conn, exam_id).await?;
        Ok(ExamDetail { exam, questions })
    }

    /// Adds a question and its options atomically.
    ///
    /// Rejected with `Validation` when fewer than `expected_option_count`
    /// options are given, any text is blank, or not exactly one option is
    /// flagged correct.
    pub async fn add_question(
        &self,
        actor_id: i64,
        exam_id: i64,
        payload: CreateQuestionPayload,
        expected_option_count: usize,
    ) -> Result<QuestionWithOptions> {
        let mut tx = begin_write(&self.pool).await?;
        let exam = fetch_exam(&mut tx, exam_id).await?;
        authorize_manage(&mut tx, actor_id, &exam).await?;

        validate_question(&payload, expected_option_count)?;

        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (exam_id, text, created_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(exam.id)
        .bind(payload.text.trim())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let options = insert_options(&mut tx, question.id, &payload.options).await?;

        tx.commit().await?;
        tracing::info!(
            exam_id,
            question_id = question.id,
            options = options.len(),
            "added question"
        );
        Ok(QuestionWithOptions { question, options })
    }

    /// Deletes a question with its options and any answers pointing at it.
    /// Attempt aggregates stay as they were recorded.
    pub async fn delete_question(&self, actor_id: i64, question_id: i64) -> Result<bool> {
        let mut tx = begin_write(&self.pool).await?;
        let Some(question) = fetch_question(&mut tx, question_id).await? else {
            return Ok(false);
        };
        let exam = fetch_exam(&mut tx, question.exam_id).await?;
        authorize_manage(&mut tx, actor_id, &exam).await?;

        let answers = sqlx::query("DELETE FROM answers WHERE question_id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let options = sqlx::query("DELETE FROM options WHERE question_id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(question_id, options, answers, "deleted question with dependents");
        Ok(true)
    }

    /// Rewrites a question's text and replaces its whole option set.
    ///
    /// Validation matches `add_question`. Recorded answers that selected one
    /// of the replaced options keep their outcome but lose the option
    /// reference. Everything happens in one transaction.
    pub async fn update_question(
        &self,
        actor_id: i64,
        question_id: i64,
        payload: CreateQuestionPayload,
        expected_option_count: usize,
    ) -> Result<QuestionWithOptions> {
        let mut tx = begin_write(&self.pool).await?;
        let question = fetch_question(&mut tx, question_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Question {} not found", question_id)))?;
        let exam = fetch_exam(&mut tx, question.exam_id).await?;
        authorize_manage(&mut tx, actor_id, &exam).await?;

        validate_question(&payload, expected_option_count)?;

        let question = sqlx::query_as::<_, Question>(
            "UPDATE questions SET text = $1 WHERE id = $2 RETURNING *",
        )
        .bind(payload.text.trim())
        .bind(question_id)
        .fetch_one(&mut *tx)
        .await?;

        let detached = sqlx::query(
            "UPDATE answers SET selected_option_id = NULL WHERE question_id = $1 AND selected_option_id IS NOT NULL",
        )
        .bind(question_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        let replaced = sqlx::query("DELETE FROM options WHERE question_id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let options = insert_options(&mut tx, question_id, &payload.options).await?;

        tx.commit().await?;
        tracing::info!(
            question_id,
            replaced,
            options = options.len(),
            detached_answers = detached,
            "updated question"
        );
        Ok(QuestionWithOptions { question, options })
    }

    /// Marks `option_id` as the only correct option of its question.
    pub async fn set_correct_option(
        &self,
        actor_id: i64,
        question_id: i64,
        option_id: i64,
    ) -> Result<Vec<AnswerOption>> {
        let mut tx = begin_write(&self.pool).await?;
        let question = fetch_question(&mut tx, question_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Question {} not found", question_id)))?;
        let exam = fetch_exam(&mut tx, question.exam_id).await?;
        authorize_manage(&mut tx, actor_id, &exam).await?;

        let belongs: Option<i64> =
            sqlx::query_scalar("SELECT id FROM options WHERE id = $1 AND question_id = $2")
                .bind(option_id)
                .bind(question_id)
                .fetch_optional(&mut *tx)
                .await?;
        if belongs.is_none() {
            return Err(Error::NotFound(format!(
                "Option {} is not an option of question {}",
                option_id, question_id
            )));
        }

        sqlx::query("UPDATE options SET is_correct = (id = $1) WHERE question_id = $2")
            .bind(option_id)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        let options = fetch_options(&mut tx, question_id).await?;
        tx.commit().await?;
        Ok(options)
    }
}

fn non_blank(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} must not be blank", field)));
    }
    Ok(trimmed.to_string())
}

/// Trimmed text, with blank treated as absent.
fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn validate_question(payload: &CreateQuestionPayload, expected_option_count: usize) -> Result<()> {
    payload.validate()?;
    non_blank("question text", &payload.text)?;

    if payload.options.len() < expected_option_count {
        return Err(Error::Validation(format!(
            "A question needs {} options, got {}",
            expected_option_count,
            payload.options.len()
        )));
    }
    for (idx, option) in payload.options.iter().enumerate() {
        option.validate()?;
        non_blank(&format!("option {}", idx + 1), &option.text)?;
    }

    let correct = payload.options.iter().filter(|o| o.is_correct).count();
    if correct != 1 {
        return Err(Error::Validation(format!(
            "Exactly one option must be marked correct, got {}",
            correct
        )));
    }
    Ok(())
}

async fn insert_options(
    conn: &mut SqliteConnection,
    question_id: i64,
    payload: &[OptionPayload],
) -> Result<Vec<AnswerOption>> {
    let mut options = Vec::with_capacity(payload.len());
    for (position, option) in payload.iter().enumerate() {
        let row = sqlx::query_as::<_, AnswerOption>(
            r#"
            INSERT INTO options (question_id, text, is_correct, position)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(question_id)
        .bind(option.text.trim())
        .bind(option.is_correct)
        .bind(position as i64)
        .fetch_one(&mut *conn)
        .await?;
        options.push(row);
    }
    Ok(options)
}

async fn delete_where_in(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    ids: &[i64],
) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let mut query_builder =
        QueryBuilder::<Sqlite>::new(format!("DELETE FROM {} WHERE {} IN (", table, column));
    let mut separated = query_builder.separated(",");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let result = query_builder.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

pub(crate) async fn fetch_exam(conn: &mut SqliteConnection, exam_id: i64) -> Result<Exam> {
    sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1")
        .bind(exam_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Exam {} not found", exam_id)))
}

async fn fetch_question(conn: &mut SqliteConnection, question_id: i64) -> Result<Option<Question>> {
    let question = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = $1")
        .bind(question_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(question)
}

async fn fetch_options(conn: &mut SqliteConnection, question_id: i64) -> Result<Vec<AnswerOption>> {
    let options = sqlx::query_as::<_, AnswerOption>(
        "SELECT * FROM options WHERE question_id = $1 ORDER BY position, id",
    )
    .bind(question_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(options)
}

/// Teachers manage their own exams and ownerless ones.
pub(crate) async fn authorize_manage(
    conn: &mut SqliteConnection,
    actor_id: i64,
    exam: &Exam,
) -> Result<User> {
    let actor = require_role(conn, actor_id, Role::Teacher).await?;
    if !exam.is_managed_by(actor.id) {
        return Err(Error::Forbidden(format!(
            "Exam {} belongs to another teacher",
            exam.id
        )));
    }
    Ok(actor)
}

/// Questions of an exam ordered by id, each with its options in authoring order.
pub(crate) async fn load_questions_with_options(
    conn: &mut SqliteConnection,
    exam_id: i64,
) -> Result<Vec<QuestionWithOptions>> {
    let questions =
        sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE exam_id = $1 ORDER BY id")
            .bind(exam_id)
            .fetch_all(&mut *conn)
            .await?;

    let options = sqlx::query_as::<_, AnswerOption>(
        r#"
        SELECT o.id, o.question_id, o.text, o.is_correct, o.position
        FROM options o
        JOIN questions q ON q.id = o.question_id
        WHERE q.exam_id = $1
        ORDER BY o.question_id, o.position, o.id
        "#,
    )
    .bind(exam_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_question: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    Ok(questions
        .into_iter()
        .map(|question| {
            let options = by_question.remove(&question.id).unwrap_or_default();
            QuestionWithOptions { question, options }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::pool::create_memory_pool;
    use crate::dto::auth_dto::RegisterRequest;
    use crate::dto::exam_dto::OptionPayload;
    use crate::services::user_service::UserService;

    async fn setup() -> (SqlitePool, ExamService, i64, i64) {
        let pool = create_memory_pool().await.unwrap();
        let users = UserService::new(pool.clone());
        let teacher = users
            .register(RegisterRequest {
                username: "teacher".into(),
                password: "password123".into(),
                role: Some(Role::Teacher),
            })
            .await
            .unwrap();
        let student = users
            .register(RegisterRequest {
                username: "student".into(),
                password: "password123".into(),
                role: None,
            })
            .await
            .unwrap();
        (pool.clone(), ExamService::new(pool), teacher.id, student.id)
    }

    fn question(text: &str, correct: usize, count: usize) -> CreateQuestionPayload {
        CreateQuestionPayload {
            text: text.into(),
            options: (0..count)
                .map(|i| OptionPayload {
                    text: format!("{} option {}", text, i + 1),
                    is_correct: i == correct,
                })
                .collect(),
        }
    }

    fn exam_payload(title: &str) -> CreateExamPayload {
        CreateExamPayload {
            title: title.into(),
            description: Some("Chapter 1".into()),
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_exam_validation() {
        let (_pool, service, teacher, student) = setup().await;

        let exam = service.create_exam(teacher, exam_payload("Algebra")).await.unwrap();
        assert_eq!(exam.author_id, Some(teacher));

        let blank = service.create_exam(teacher, exam_payload("   ")).await.unwrap_err();
        assert!(matches!(blank, Error::Validation(_)));

        let long = service
            .create_exam(teacher, exam_payload(&"x".repeat(101)))
            .await
            .unwrap_err();
        assert!(matches!(long, Error::Validation(_)));

        let forbidden = service.create_exam(student, exam_payload("Nope")).await.unwrap_err();
        assert!(matches!(forbidden, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_add_question_errors() {
        let (pool, service, teacher, student) = setup().await;
        let exam = service.create_exam(teacher, exam_payload("Algebra")).await.unwrap();

        let missing = service
            .add_question(teacher, 9999, question("q", 0, 4), 4)
            .await
            .unwrap_err();
        assert!(matches!(missing, Error::NotFound(_)));

        let forbidden = service
            .add_question(student, exam.id, question("q", 0, 4), 4)
            .await
            .unwrap_err();
        assert!(matches!(forbidden, Error::Forbidden(_)));

        let too_few = service
            .add_question(teacher, exam.id, question("q", 0, 3), 4)
            .await
            .unwrap_err();
        assert!(matches!(too_few, Error::Validation(_)));

        let mut blank_option = question("q", 0, 4);
        blank_option.options[2].text = "  ".into();
        let blank = service
            .add_question(teacher, exam.id, blank_option, 4)
            .await
            .unwrap_err();
        assert!(matches!(blank, Error::Validation(_)));

        let mut two_correct = question("q", 0, 4);
        two_correct.options[1].is_correct = true;
        let ambiguous = service
            .add_question(teacher, exam.id, two_correct, 4)
            .await
            .unwrap_err();
        assert!(matches!(ambiguous, Error::Validation(_)));

        assert_eq!(count(&pool, "questions").await, 0);
        assert_eq!(count(&pool, "options").await, 0);
    }

    #[tokio::test]
    async fn test_other_teacher_cannot_add_questions() {
        let (pool, service, teacher, _student) = setup().await;
        let other = UserService::new(pool.clone())
            .register(RegisterRequest {
                username: "other_teacher".into(),
                password: "password123".into(),
                role: Some(Role::Teacher),
            })
            .await
            .unwrap();
        let exam = service.create_exam(teacher, exam_payload("Algebra")).await.unwrap();

        let err = service
            .add_question(other.id, exam.id, question("q", 0, 4), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert_eq!(count(&pool, "questions").await, 0);
    }

    #[tokio::test]
    async fn test_add_question_persists_options_in_order() {
        let (_pool, service, teacher, _student) = setup().await;
        let exam = service.create_exam(teacher, exam_payload("Algebra")).await.unwrap();

        let added = service
            .add_question(teacher, exam.id, question("2+2", 3, 4), 4)
            .await
            .unwrap();
        assert_eq!(added.options.len(), 4);
        assert!(added.options[3].is_correct);

        let detail = service.get_exam_detail(exam.id).await.unwrap();
        assert_eq!(detail.questions.len(), 1);
        let texts: Vec<_> = detail.questions[0].options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["2+2 option 1", "2+2 option 2", "2+2 option 3", "2+2 option 4"]
        );
    }

    #[tokio::test]
    async fn test_set_correct_option_keeps_single_flag() {
        let (_pool, service, teacher, _student) = setup().await;
        let exam = service.create_exam(teacher, exam_payload("Algebra")).await.unwrap();
        let added = service
            .add_question(teacher, exam.id, question("q", 0, 4), 4)
            .await
            .unwrap();

        let target = added.options[2].id;
        let options = service
            .set_correct_option(teacher, added.question.id, target)
            .await
            .unwrap();
        let flagged: Vec<_> = options.iter().filter(|o| o.is_correct).map(|o| o.id).collect();
        assert_eq!(flagged, vec![target]);

        let other = service
            .add_question(teacher, exam.id, question("r", 0, 4), 4)
            .await
            .unwrap();
        let err = service
            .set_correct_option(teacher, added.question.id, other.options[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_exam() {
        let (_pool, service, teacher, student) = setup().await;
        let exam = service.create_exam(teacher, exam_payload("Algebra")).await.unwrap();

        let updated = service
            .update_exam(
                teacher,
                exam.id,
                UpdateExamPayload {
                    title: Some("Algebra II".into()),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Algebra II");
        assert_eq!(updated.description.as_deref(), Some("Chapter 1"));

        let err = service
            .update_exam(student, exam.id, UpdateExamPayload::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let cleared = service
            .update_exam(
                teacher,
                exam.id,
                UpdateExamPayload {
                    title: None,
                    description: Some("   ".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.title, "Algebra II");
        assert_eq!(cleared.description, None);
    }

    #[tokio::test]
    async fn test_blank_description_is_stored_as_null() {
        let (_pool, service, teacher, _) = setup().await;
        let exam = service
            .create_exam(
                teacher,
                CreateExamPayload {
                    title: "Algebra".into(),
                    description: Some("  ".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(exam.description, None);
    }

    #[tokio::test]
    async fn test_update_question_replaces_options() {
        let (pool, service, teacher, _) = setup().await;
        let exam = service.create_exam(teacher, exam_payload("Algebra")).await.unwrap();
        let original = service
            .add_question(teacher, exam.id, question("1 + 1", 0, 4), 4)
            .await
            .unwrap();

        let updated = service
            .update_question(teacher, original.question.id, question("2 + 2", 3, 4), 4)
            .await
            .unwrap();
        assert_eq!(updated.question.id, original.question.id);
        assert_eq!(updated.question.text, "2 + 2");
        assert_eq!(updated.options.len(), 4);
        assert!(updated.options[3].is_correct);
        assert!(updated
            .options
            .iter()
            .all(|o| original.options.iter().all(|old| old.id != o.id)));
        assert_eq!(count(&pool, "options").await, 4);
    }

    #[tokio::test]
    async fn test_update_question_rejections_leave_question_intact() {
        let (pool, service, teacher, student) = setup().await;
        let exam = service.create_exam(teacher, exam_payload("Algebra")).await.unwrap();
        let original = service
            .add_question(teacher, exam.id, question("1 + 1", 0, 4), 4)
            .await
            .unwrap();
        let qid = original.question.id;

        let mut two_correct = question("Changed", 0, 4);
        two_correct.options[1].is_correct = true;
        let err = service
            .update_question(teacher, qid, two_correct, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = service
            .update_question(teacher, qid, question("Changed", 0, 3), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = service
            .update_question(student, qid, question("Changed", 0, 4), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let err = service
            .update_question(teacher, qid + 100, question("Changed", 0, 4), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let detail = service.get_exam_detail(exam.id).await.unwrap();
        assert_eq!(detail.questions[0].question.text, "1 + 1");
        assert_eq!(detail.questions[0].options, original.options);
        assert_eq!(count(&pool, "options").await, 4);
    }

    #[tokio::test]
    async fn test_delete_question_removes_options() {
        let (pool, service, teacher, _student) = setup().await;
        let exam = service.create_exam(teacher, exam_payload("Algebra")).await.unwrap();
        let keep = service
            .add_question(teacher, exam.id, question("keep", 0, 4), 4)
            .await
            .unwrap();
        let drop = service
            .add_question(teacher, exam.id, question("drop", 0, 4), 4)
            .await
            .unwrap();

        assert!(service.delete_question(teacher, drop.question.id).await.unwrap());
        assert!(!service.delete_question(teacher, drop.question.id).await.unwrap());

        let detail = service.get_exam_detail(exam.id).await.unwrap();
        assert_eq!(detail.questions.len(), 1);
        assert_eq!(detail.questions[0].question.id, keep.question.id);
        assert_eq!(count(&pool, "options").await, 4);
    }

    #[tokio::test]
    async fn test_list_exams_by_author() {
        let (_pool, service, teacher, _student) = setup().await;
        service.create_exam(teacher, exam_payload("One")).await.unwrap();
        service.create_exam(teacher, exam_payload("Two")).await.unwrap();

        assert_eq!(service.list_exams_by_author(teacher).await.unwrap().len(), 2);
        assert_eq!(service.list_exams().await.unwrap().len(), 2);
        assert!(service.list_exams_by_author(teacher + 100).await.unwrap().is_empty());
    }
}
