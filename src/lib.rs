pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::services::{
    attempt_service::AttemptService, exam_service::ExamService, user_service::UserService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub user_service: UserService,
    pub exam_service: ExamService,
    pub attempt_service: AttemptService,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let user_service = UserService::new(pool.clone());
        let exam_service = ExamService::new(pool.clone());
        let attempt_service = AttemptService::new(pool.clone(), config.allow_retakes);

        Self {
            pool,
            config: Arc::new(config),
            user_service,
            exam_service,
            attempt_service,
        }
    }
}
