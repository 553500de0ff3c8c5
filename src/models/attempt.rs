use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;

/// Raw submission: question id -> selected option id (or explicit no answer).
pub type Selections = BTreeMap<i64, Option<i64>>;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attempt {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub attempt_number: i64,
    pub score: i64,
    pub total: i64,
    pub selections: Json<Selections>,
    pub submitted_at: DateTime<Utc>,
}
