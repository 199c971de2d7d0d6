use super::entities::{app, app_image, category, upvote, App, AppImage, Category, Upvote};
use super::backend_err;
use crate::application::ListingStore;
use crate::domain::{AppSummary, AppWithDetails, NewApp, Platform};
use effihub_errors::AppError;
use sea_orm::{entity::*, query::*, DatabaseConnection};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppRepository {
    db: DatabaseConnection,
}

pub(super) fn to_summary(model: app::Model) -> AppSummary {
    AppSummary {
        id: model.id,
        name: model.name,
        slogan: model.slogan,
        logo_url: model.logo_url,
        app_link: model.app_link,
        platform: Platform::parse(&model.platform),
        category_id: model.category_id,
        user_id: model.user_id,
        upvotes_count: model.upvotes_count.max(0) as i64,
        created_at: model.created_at,
    }
}

impl AppRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, user_id: Uuid, new_app: NewApp) -> Result<AppSummary, AppError> {
        let active = app::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new_app.name),
            slogan: Set(new_app.slogan),
            description: Set(new_app.description),
            logo_url: Set(new_app.logo_url),
            app_link: Set(new_app.app_link),
            platform: Set(new_app.platform.as_str().to_string()),
            category_id: Set(new_app.category_id),
            user_id: Set(user_id),
            upvotes_count: Set(0),
            created_at: Set(Some(chrono::Utc::now())),
            updated_at: Set(Some(chrono::Utc::now())),
        };
        let model = active.insert(&self.db).await.map_err(backend_err)?;
        Ok(to_summary(model))
    }

    pub async fn find_summary(&self, id: Uuid) -> Result<Option<AppSummary>, AppError> {
        let model = App::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(model.map(to_summary))
    }

    pub async fn find_with_details(
        &self,
        id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> Result<Option<AppWithDetails>, AppError> {
        let Some(model) = App::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(backend_err)?
        else {
            return Ok(None);
        };
        let mut detailed = self.with_details(vec![model], viewer_id).await?;
        let Some(mut details) = detailed.pop() else {
            return Ok(None);
        };
        details.images = AppImage::find()
            .filter(app_image::Column::AppId.eq(id))
            .order_by_asc(app_image::Column::DisplayOrder)
            .all(&self.db)
            .await
            .map_err(backend_err)?
            .into_iter()
            .map(|image| image.image_url)
            .collect();
        Ok(Some(details))
    }

    /// Top-ranked listing: vote count descending, newest first among ties.
    pub async fn top_ranked(
        &self,
        limit: u64,
        viewer_id: Option<Uuid>,
    ) -> Result<Vec<AppWithDetails>, AppError> {
        let rows = App::find()
            .order_by_desc(app::Column::UpvotesCount)
            .order_by_desc(app::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(backend_err)?;
        self.with_details(rows, viewer_id).await
    }

    /// Same ordering as `top_ranked` without the per-viewer enrichment, used
    /// to refresh the featured ranking provider.
    pub async fn top_summaries(&self, limit: u64) -> Result<Vec<AppSummary>, AppError> {
        let rows = App::find()
            .order_by_desc(app::Column::UpvotesCount)
            .order_by_desc(app::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(rows.into_iter().map(to_summary).collect())
    }

    pub async fn newest(
        &self,
        limit: u64,
        viewer_id: Option<Uuid>,
    ) -> Result<Vec<AppWithDetails>, AppError> {
        let rows = App::find()
            .order_by_desc(app::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(backend_err)?;
        self.with_details(rows, viewer_id).await
    }

    pub async fn search(
        &self,
        query: &str,
        viewer_id: Option<Uuid>,
    ) -> Result<Vec<AppWithDetails>, AppError> {
        let pattern = format!("%{}%", query.trim());
        let rows = App::find()
            .filter(
                Condition::any()
                    .add(app::Column::Name.contains(query.trim()))
                    .add(app::Column::Slogan.like(&pattern))
                    .add(app::Column::Description.like(&pattern)),
            )
            .order_by_desc(app::Column::UpvotesCount)
            .all(&self.db)
            .await
            .map_err(backend_err)?;
        self.with_details(rows, viewer_id).await
    }

    pub async fn by_category(
        &self,
        category_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> Result<Vec<AppWithDetails>, AppError> {
        let rows = App::find()
            .filter(app::Column::CategoryId.eq(category_id))
            .order_by_desc(app::Column::UpvotesCount)
            .all(&self.db)
            .await
            .map_err(backend_err)?;
        self.with_details(rows, viewer_id).await
    }

    pub async fn owned_by(&self, user_id: Uuid) -> Result<Vec<AppSummary>, AppError> {
        let rows = App::find()
            .filter(app::Column::UserId.eq(user_id))
            .order_by_desc(app::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(rows.into_iter().map(to_summary).collect())
    }

    /// Insert screenshot rows for an app, preserving the given order.
    async fn insert_images(&self, app_id: Uuid, image_urls: Vec<String>) -> Result<(), AppError> {
        for (index, image_url) in image_urls.into_iter().enumerate() {
            let active = app_image::ActiveModel {
                id: Set(Uuid::new_v4()),
                app_id: Set(app_id),
                image_url: Set(image_url),
                display_order: Set(index as i32),
                created_at: Set(Some(chrono::Utc::now())),
            };
            active.insert(&self.db).await.map_err(backend_err)?;
        }
        Ok(())
    }

    /// Enrich listing rows with their category name and the viewer's vote
    /// status. The voted set is fetched once per page, not per row.
    async fn with_details(
        &self,
        rows: Vec<app::Model>,
        viewer_id: Option<Uuid>,
    ) -> Result<Vec<AppWithDetails>, AppError> {
        let voted: HashSet<Uuid> = match viewer_id {
            Some(user_id) => Upvote::find()
                .filter(upvote::Column::UserId.eq(user_id))
                .all(&self.db)
                .await
                .map_err(backend_err)?
                .into_iter()
                .map(|row| row.app_id)
                .collect(),
            None => HashSet::new(),
        };

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let category_name = Category::find_by_id(row.category_id)
                .one(&self.db)
                .await
                .map_err(backend_err)?
                .map(|c: category::Model| c.name);

            results.push(AppWithDetails {
                id: row.id,
                name: row.name,
                slogan: row.slogan,
                description: row.description,
                logo_url: row.logo_url,
                app_link: row.app_link,
                platform: Platform::parse(&row.platform),
                category_name,
                upvotes_count: row.upvotes_count.max(0) as i64,
                is_upvoted: voted.contains(&row.id),
                images: Vec::new(),
                created_at: row.created_at,
            });
        }
        Ok(results)
    }
}

impl ListingStore for AppRepository {
    async fn insert_app(&self, user_id: Uuid, new_app: NewApp) -> Result<AppSummary, AppError> {
        self.create(user_id, new_app).await
    }

    async fn add_images(&self, app_id: Uuid, image_urls: Vec<String>) -> Result<(), AppError> {
        self.insert_images(app_id, image_urls).await
    }
}
