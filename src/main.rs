pub mod auth;
pub mod db;
pub mod err;
pub mod models;
pub mod students;

use axum::{routing::get, routing::post, response::IntoResponse, Router, Json};

use std::net::SocketAddr;
use axum::handler::Handler;
use axum::http::Uri;
use axum::Extension;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use crate::err::Error;

pub type RefStr = &'static str;
pub type Payload<T> = Result<Json<T>, Error>;

fn app(pool: PgPool) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/student/:student_id", get(students::read_student))
        .route("/students/batch", post(students::batch_students))
        .route("/test-db", get(students::test_db))
        .route("/student/create", post(auth::register_student))
        .route("/auth/login", post(auth::login_student))
        .fallback(err::handler404.into_service())
        .layer(Extension(pool))
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = db::DbConfig::from_env()?;
    log::info!(
        "connecting to postgres at {}:{} as `{}`, database `{}`",
        config.host,
        config.port,
        config.user,
        config.database
    );
    let pool = config.connect().await?;
    db::ping(&pool)
        .await
        .map_err(|_| anyhow::anyhow!("startup database probe failed"))?;
    log::info!("PostgreSQL connected");

    let port = match std::env::var("PORT") {
        Ok(port) => port.parse()?,
        Err(_) => 3000,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("Starting student records HTTP server on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app(pool.clone()).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    log::info!("connection pool closed, server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("could not listen for shutdown signal: {}", err);
        // Resolving here would stop the server; keep serving instead.
        std::future::pending::<()>().await;
    }
    log::info!("shutdown signal received, draining requests");
}

async fn root() -> RefStr {
    "API is running..."
}
