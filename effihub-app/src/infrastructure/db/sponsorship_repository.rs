use super::entities::{app, sponsored_app, App, SponsoredApp};
use super::{app_repository, backend_err};
use crate::application::SponsorStore;
use crate::domain::{CurrentSponsor, NewSponsorship, SlotStatus, SponsorshipSlot};
use chrono::NaiveDate;
use effihub_errors::AppError;
use sea_orm::{entity::*, query::*, DatabaseConnection};
use uuid::Uuid;

fn to_domain(model: sponsored_app::Model) -> SponsorshipSlot {
    SponsorshipSlot {
        id: model.id,
        app_id: model.app_id,
        user_id: model.user_id,
        start_date: model.start_date,
        end_date: model.end_date,
        status: SlotStatus::parse(&model.status).unwrap_or(SlotStatus::Pending),
        banner_url: model.banner_url,
        message: model.message,
        created_at: model.created_at,
    }
}

/// Column values for slots that consume a week's capacity.
fn binding_statuses() -> Vec<&'static str> {
    SlotStatus::ALL
        .iter()
        .filter(|status| status.is_binding())
        .map(SlotStatus::as_str)
        .collect()
}

#[derive(Clone)]
pub struct SponsorshipRepository {
    db: DatabaseConnection,
}

impl SponsorshipRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The slot occupying the homepage spot right now: a binding slot whose
    /// week covers today, joined with its app. None simply means no sponsor
    /// section is rendered.
    pub async fn current_sponsor(
        &self,
        today: NaiveDate,
    ) -> Result<Option<CurrentSponsor>, AppError> {
        let Some(slot) = SponsoredApp::find()
            .filter(sponsored_app::Column::Status.is_in(binding_statuses()))
            .filter(sponsored_app::Column::StartDate.lte(today))
            .filter(sponsored_app::Column::EndDate.gte(today))
            .order_by_desc(sponsored_app::Column::StartDate)
            .one(&self.db)
            .await
            .map_err(backend_err)?
        else {
            return Ok(None);
        };

        let Some(sponsored) = App::find_by_id(slot.app_id)
            .one(&self.db)
            .await
            .map_err(backend_err)?
        else {
            return Ok(None);
        };

        Ok(Some(CurrentSponsor {
            slot: to_domain(slot),
            app: app_repository::to_summary(sponsored),
        }))
    }
}

impl SponsorStore for SponsorshipRepository {
    async fn apps_owned_by(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let rows = App::find()
            .filter(app::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    async fn booked_start_dates(&self) -> Result<Vec<NaiveDate>, AppError> {
        let rows = SponsoredApp::find()
            .filter(sponsored_app::Column::Status.is_in(binding_statuses()))
            .all(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(rows.into_iter().map(|row| row.start_date).collect())
    }

    async fn insert_pending(&self, slot: NewSponsorship) -> Result<SponsorshipSlot, AppError> {
        let active = sponsored_app::ActiveModel {
            id: Set(Uuid::new_v4()),
            app_id: Set(slot.app_id),
            user_id: Set(slot.user_id),
            start_date: Set(slot.start_date),
            end_date: Set(slot.end_date),
            status: Set(SlotStatus::Pending.as_str().to_string()),
            banner_url: Set(slot.banner_url),
            message: Set(slot.message),
            created_at: Set(Some(chrono::Utc::now())),
        };
        let model = active.insert(&self.db).await.map_err(backend_err)?;
        Ok(to_domain(model))
    }
}
