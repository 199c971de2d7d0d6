use super::entities::{app, upvote, App, Upvote};
use super::backend_err;
use crate::application::VoteStore;
use effihub_errors::AppError;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, SqlErr};
use uuid::Uuid;

#[derive(Clone)]
pub struct UpvoteRepository {
    db: DatabaseConnection,
}

impl UpvoteRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn exists(&self, app_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let row = Upvote::find_by_id((app_id, user_id))
            .one(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(row.is_some())
    }

    async fn adjust_count(&self, app_id: Uuid, delta: i32) -> Result<(), AppError> {
        let Some(found) = App::find_by_id(app_id)
            .one(&self.db)
            .await
            .map_err(backend_err)?
        else {
            return Err(AppError::NotFound("app".to_string()));
        };

        let new_count = (found.upvotes_count + delta).max(0);
        let mut active: app::ActiveModel = found.into();
        active.upvotes_count = Set(new_count);
        active.update(&self.db).await.map_err(backend_err)?;
        Ok(())
    }
}

impl VoteStore for UpvoteRepository {
    /// The composite primary key on (app_id, user_id) is the uniqueness
    /// constraint; a violation surfaces as `AppError::Conflict` so the
    /// caller can run the duplicate-as-toggle fallback.
    async fn insert_if_absent(&self, app_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let active = upvote::ActiveModel {
            app_id: Set(app_id),
            user_id: Set(user_id),
            created_at: Set(Some(chrono::Utc::now())),
        };
        match active.insert(&self.db).await {
            Ok(_) => {
                self.adjust_count(app_id, 1).await?;
                Ok(())
            }
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(AppError::Conflict),
                _ => Err(backend_err(err)),
            },
        }
    }

    async fn delete_by_match(&self, app_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let result: Result<_, DbErr> = Upvote::delete_many()
            .filter(upvote::Column::AppId.eq(app_id))
            .filter(upvote::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await;
        let deleted = result.map_err(backend_err)?;
        if deleted.rows_affected > 0 {
            self.adjust_count(app_id, -1).await?;
        }
        Ok(())
    }
}
