pub mod entities;
mod app_repository;
mod category_repository;
mod profile_repository;
mod sponsorship_repository;
mod upvote_repository;

pub use app_repository::AppRepository;
pub use category_repository::CategoryRepository;
pub use profile_repository::ProfileRepository;
pub use sponsorship_repository::SponsorshipRepository;
pub use upvote_repository::UpvoteRepository;

use effihub_errors::AppError;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::time::Duration;

pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url);
    opt.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    Database::connect(opt).await
}

pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    let migration = include_str!("../../../../migrations/001_initial.sql");

    // Statements are idempotent (IF NOT EXISTS / OR REPLACE), so reruns on
    // an existing schema are harmless.
    for statement in migration.split(';') {
        let statement = statement.trim();
        if !statement.is_empty() {
            let _ = db
                .execute(Statement::from_string(
                    sea_orm::DatabaseBackend::Postgres,
                    statement.to_string(),
                ))
                .await;
        }
    }

    Ok(())
}

pub(crate) fn backend_err(err: DbErr) -> AppError {
    AppError::Backend(err.to_string())
}
