use crate::database::pool::begin_write;
use crate::dto::auth_dto::{LoginRequest, RegisterRequest};
use crate::error::{Error, Result};
use crate::models::user::{Role, User};
use crate::utils::crypto::{hash_password, verify_password};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use validator::Validate;

#[derive(Clone)]
pub struct UserService {
    pool: SqlitePool,
}

impl UserService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates an account. A taken username is a validation error and leaves
    /// the existing row untouched.
    pub async fn register(&self, payload: RegisterRequest) -> Result<User> {
        payload.validate()?;
        let username = payload.username.trim().to_string();
        if username.len() != payload.username.len() || username.is_empty() {
            return Err(Error::Validation(
                "Username must not start or end with whitespace".to_string(),
            ));
        }
        let role = payload.role.unwrap_or(Role::Student);
        let password_hash = hash_password(&payload.password)?;

        let mut tx = begin_write(&self.pool).await?;

        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = $1")
            .bind(&username)
            .fetch_one(&mut *tx)
            .await?;
        if taken > 0 {
            return Err(Error::Validation(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        // The UNIQUE constraint still catches a concurrent registration.
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&username)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(user_id = user.id, role = %user.role, "registered user {}", user.username);
        Ok(user)
    }

    pub async fn authenticate(&self, payload: &LoginRequest) -> Result<User> {
        payload.validate()?;
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(&payload.username)
            .fetch_optional(&self.pool)
            .await?;

        match user {
            Some(user) if verify_password(&payload.password, &user.password_hash)? => Ok(user),
            _ => {
                tracing::info!("failed login for {}", payload.username);
                Err(Error::Unauthorized("Invalid username or password".to_string()))
            }
        }
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        let mut conn = self.pool.acquire().await?;
        fetch_user(&mut *conn, user_id).await
    }

    /// Creates the configured teacher account unless the name is taken.
    pub async fn ensure_teacher(&self, username: &str, password: &str) -> Result<Option<User>> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Ok(None);
        }

        let user = self
            .register(RegisterRequest {
                username: username.to_string(),
                password: password.to_string(),
                role: Some(Role::Teacher),
            })
            .await?;
        Ok(Some(user))
    }
}

pub(crate) async fn fetch_user(conn: &mut SqliteConnection, user_id: i64) -> Result<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))
}

pub(crate) async fn require_role(conn: &mut SqliteConnection, user_id: i64, role: Role) -> Result<User> {
    let user = fetch_user(conn, user_id).await?;
    if user.role != role {
        return Err(Error::Forbidden(format!("Only a {} may do this", role)));
    }
    Ok(user)
}
