use super::entities::{app, category, App, Category as CategoryEntity};
use super::backend_err;
use crate::domain::{Category, CategoryWithCount};
use effihub_errors::AppError;
use sea_orm::{entity::*, query::*, DatabaseConnection, PaginatorTrait};

fn to_domain(model: category::Model) -> Category {
    Category {
        id: model.id,
        name: model.name,
        slug: model.slug,
        description: model.description,
        icon: model.icon,
    }
}

#[derive(Clone)]
pub struct CategoryRepository {
    db: DatabaseConnection,
}

impl CategoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError> {
        let model = CategoryEntity::find()
            .filter(category::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(model.map(to_domain))
    }

    pub async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>, AppError> {
        let categories = CategoryEntity::find()
            .order_by_asc(category::Column::Name)
            .all(&self.db)
            .await
            .map_err(backend_err)?;

        let mut results = Vec::with_capacity(categories.len());
        for model in categories {
            let app_count = App::find()
                .filter(app::Column::CategoryId.eq(model.id))
                .count(&self.db)
                .await
                .map_err(backend_err)?;
            results.push(CategoryWithCount {
                category: to_domain(model),
                app_count,
            });
        }
        Ok(results)
    }
}
