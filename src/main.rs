use exam_backend::{
    config::Config,
    database::pool::{create_pool, run_migrations},
    routes::create_router,
    AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config).await?;
    run_migrations(&pool).await?;

    let app_state = AppState::new(pool, config.clone());

    if let (Some(username), Some(password)) = (
        config.seed_teacher_username.as_deref(),
        config.seed_teacher_password.as_deref(),
    ) {
        match app_state.user_service.ensure_teacher(username, password).await? {
            Some(user) => info!(user_id = user.id, "Seeded teacher account '{}'", username),
            None => info!("Teacher account '{}' already exists", username),
        }
    }

    let app = create_router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
