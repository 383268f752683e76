use anyhow::Context;
use axum::Router;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use tsudoi::auth::token::Keys;
use tsudoi::{auth, realtime, rooms, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let database_url = dotenv::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let jwt_secret = dotenv::var("JWT_SECRET").context("JWT_SECRET is not set")?;

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(&database_url)
        .await
        .context("failed to open the database")?;
    sqlx::migrate!().run(&db_pool).await?;

    let state = AppState::new(db_pool, Keys::new(jwt_secret.as_bytes()));

    // the well-known room exists before the first client shows up
    realtime::membership::ensure_general_room(&state.db_pool).await?;
    realtime::spawn_dispatcher(&state.bus, state.registry.clone());

    let app = Router::new()
        .nest("/api", auth::router().merge(rooms::router()))
        .merge(realtime::router())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = dotenv::var("PORT").unwrap_or_else(|_| "8000".to_owned());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
