use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// `None` for exams created without a tracked author.
    pub author_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Exam {
    /// Ownerless exams may be managed by any teacher.
    pub fn is_managed_by(&self, user_id: i64) -> bool {
        self.author_id.map_or(true, |author| author == user_id)
    }
}
