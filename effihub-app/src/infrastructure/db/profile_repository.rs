use super::entities::{profile, Profile as ProfileEntity};
use super::backend_err;
use crate::domain::Profile;
use effihub_errors::AppError;
use sea_orm::{entity::*, query::*, DatabaseConnection};
use uuid::Uuid;

fn to_domain(model: profile::Model) -> Profile {
    Profile {
        id: model.id,
        google_id: model.google_id,
        email: model.email,
        name: model.name,
        avatar_url: model.avatar_url,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[derive(Clone)]
pub struct ProfileRepository {
    db: DatabaseConnection,
}

impl ProfileRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        let model = ProfileEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(model.map(to_domain))
    }

    pub async fn find_by_google_id(&self, google_id: &str) -> Result<Option<Profile>, AppError> {
        let model = ProfileEntity::find()
            .filter(profile::Column::GoogleId.eq(google_id))
            .one(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(model.map(to_domain))
    }

    /// Insert-or-update keyed on the OAuth subject, run on every sign-in.
    pub async fn upsert(&self, data: &Profile) -> Result<Profile, AppError> {
        if let Some(existing) = self.find_by_google_id(&data.google_id).await? {
            let mut active = profile::ActiveModel {
                id: Set(existing.id),
                ..Default::default()
            };
            active.email = Set(data.email.clone());
            active.name = Set(data.name.clone());
            active.avatar_url = Set(data.avatar_url.clone());
            active.updated_at = Set(Some(chrono::Utc::now()));
            let model = active.update(&self.db).await.map_err(backend_err)?;
            Ok(to_domain(model))
        } else {
            let active = profile::ActiveModel {
                id: Set(data.id),
                google_id: Set(data.google_id.clone()),
                email: Set(data.email.clone()),
                name: Set(data.name.clone()),
                avatar_url: Set(data.avatar_url.clone()),
                created_at: Set(Some(chrono::Utc::now())),
                updated_at: Set(Some(chrono::Utc::now())),
            };
            let model = active.insert(&self.db).await.map_err(backend_err)?;
            Ok(to_domain(model))
        }
    }
}
