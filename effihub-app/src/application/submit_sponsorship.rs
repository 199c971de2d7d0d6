use chrono::{Days, NaiveDate};
use effihub_errors::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::image_upload::{validate_image, ImageUpload};
use crate::application::sponsor_calendar::{
    blackout_week, is_monday, is_week_booked, upcoming_weeks, SponsorWeek, UPCOMING_WEEK_COUNT,
};
use crate::domain::{NewSponsorship, SponsorshipSlot, Viewer};

/// An unvalidated sponsorship submission as it leaves the form.
#[derive(Debug, Clone)]
pub struct SponsorshipForm {
    pub app_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub message: Option<String>,
    pub banner: Option<ImageUpload>,
}

/// One row of the availability table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekAvailability {
    pub week: SponsorWeek,
    pub booked: bool,
}

/// The reads and writes a submission needs against the sponsorship table.
pub trait SponsorStore {
    fn apps_owned_by(
        &self,
        user_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Uuid>, AppError>> + Send;

    /// Start dates of every paid or approved slot. Pending and rejected
    /// requests are non-binding and excluded.
    fn booked_start_dates(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<NaiveDate>, AppError>> + Send;

    fn insert_pending(
        &self,
        slot: NewSponsorship,
    ) -> impl std::future::Future<Output = Result<SponsorshipSlot, AppError>> + Send;
}

/// Blob storage boundary: bytes plus a path in, a durable public URL out.
pub trait BlobStore {
    fn store(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<String, AppError>> + Send;
}

/// Validate a submission against everything that can be checked before any
/// write: ownership, the Monday rule, the blackout, the banner format and
/// current availability.
pub fn validate_request(
    form: &SponsorshipForm,
    today: NaiveDate,
    owned_apps: &[Uuid],
    booked_starts: &[NaiveDate],
) -> Result<(), AppError> {
    let app_id = form
        .app_id
        .ok_or_else(|| AppError::validation("app_id", "Please select an app"))?;
    if !owned_apps.contains(&app_id) {
        return Err(AppError::validation(
            "app_id",
            "You can only sponsor your own apps",
        ));
    }

    // The blackout date is refused before anything else, weekday or not.
    if form.start_date == blackout_week() {
        return Err(AppError::validation(
            "start_date",
            "This week is not available",
        ));
    }
    if !is_monday(form.start_date) {
        return Err(AppError::validation(
            "start_date",
            "Sponsorship weeks must start on a Monday",
        ));
    }
    if form.start_date < today {
        return Err(AppError::validation(
            "start_date",
            "Please select an upcoming week",
        ));
    }

    let banner = form
        .banner
        .as_ref()
        .ok_or_else(|| AppError::validation("banner", "Banner image is required"))?;
    validate_image("banner", banner)?;

    if is_week_booked(form.start_date, booked_starts) {
        return Err(AppError::WeekBooked);
    }

    Ok(())
}

/// Handles a sponsorship request: re-validates at submit time, uploads the
/// banner and writes the pending slot. Paid/approved/rejected transitions
/// happen out of band in review; this path only ever writes `pending`.
pub struct SubmitSponsorship<S: SponsorStore, B: BlobStore> {
    store: S,
    blobs: B,
}

impl<S: SponsorStore, B: BlobStore> SubmitSponsorship<S, B> {
    pub fn new(store: S, blobs: B) -> Self {
        Self { store, blobs }
    }

    /// The availability table: upcoming weeks with their booked flag.
    pub async fn availability(&self) -> Result<Vec<WeekAvailability>, AppError> {
        let booked = self.store.booked_start_dates().await?;
        Ok(upcoming_weeks(UPCOMING_WEEK_COUNT)
            .into_iter()
            .map(|week| WeekAvailability {
                booked: is_week_booked(week.start, &booked),
                week,
            })
            .collect())
    }

    pub async fn execute(
        &self,
        viewer: Option<&Viewer>,
        form: SponsorshipForm,
        today: NaiveDate,
    ) -> Result<SponsorshipSlot, AppError> {
        let viewer = viewer.ok_or(AppError::Unauthenticated)?;

        // Availability is re-read here, not trusted from render time; the
        // check-then-insert gap that remains is the accepted consistency
        // bound.
        let owned = self.store.apps_owned_by(viewer.id).await?;
        let booked = self.store.booked_start_dates().await?;
        validate_request(&form, today, &owned, &booked)?;

        let banner = form.banner.expect("validated");
        let path = format!(
            "sponsor-banners/{}_{}.{}",
            viewer.id,
            chrono::Utc::now().timestamp_millis(),
            banner.extension()
        );
        // If anything after this upload fails the blob is orphaned; that
        // leak is accepted rather than rolling back a multi-step submit.
        let banner_url = self
            .blobs
            .store(&path, &banner.content_type, banner.bytes)
            .await?;

        let slot = self
            .store
            .insert_pending(NewSponsorship {
                app_id: form.app_id.expect("validated"),
                user_id: viewer.id,
                start_date: form.start_date,
                end_date: form.start_date + Days::new(6),
                banner_url,
                message: form.message,
            })
            .await?;

        tracing::info!(slot_id = %slot.id, start = %slot.start_date, "sponsorship request submitted");
        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SlotStatus;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn viewer() -> Viewer {
        Viewer {
            id: Uuid::new_v4(),
            email: "maker@example.com".into(),
        }
    }

    fn png_banner() -> ImageUpload {
        ImageUpload {
            file_name: "banner.png".into(),
            content_type: "image/png".into(),
            bytes: vec![0u8; 16],
        }
    }

    fn form(app_id: Uuid, start: NaiveDate) -> SponsorshipForm {
        SponsorshipForm {
            app_id: Some(app_id),
            start_date: start,
            message: None,
            banner: Some(png_banner()),
        }
    }

    #[derive(Default)]
    struct MemorySponsorStore {
        owned: Vec<Uuid>,
        booked: Vec<NaiveDate>,
        inserted: Mutex<Vec<NewSponsorship>>,
        fail_insert: AtomicBool,
    }

    impl SponsorStore for &MemorySponsorStore {
        async fn apps_owned_by(&self, _user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
            Ok(self.owned.clone())
        }

        async fn booked_start_dates(&self) -> Result<Vec<NaiveDate>, AppError> {
            Ok(self.booked.clone())
        }

        async fn insert_pending(&self, slot: NewSponsorship) -> Result<SponsorshipSlot, AppError> {
            if self.fail_insert.load(Ordering::SeqCst) {
                return Err(AppError::Backend("insert failed".into()));
            }
            let stored = SponsorshipSlot {
                id: Uuid::new_v4(),
                app_id: slot.app_id,
                user_id: slot.user_id,
                start_date: slot.start_date,
                end_date: slot.end_date,
                status: SlotStatus::Pending,
                banner_url: slot.banner_url.clone(),
                message: slot.message.clone(),
                created_at: None,
            };
            self.inserted.lock().unwrap().push(slot);
            Ok(stored)
        }
    }

    #[derive(Default)]
    struct MemoryBlobStore {
        uploads: AtomicUsize,
    }

    impl BlobStore for &MemoryBlobStore {
        async fn store(
            &self,
            path: &str,
            _content_type: &str,
            _bytes: Vec<u8>,
        ) -> Result<String, AppError> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://cdn.example.com/{path}"))
        }
    }

    const TODAY: (i32, u32, u32) = (2024, 5, 30);

    fn today() -> NaiveDate {
        date(TODAY.0, TODAY.1, TODAY.2)
    }

    #[tokio::test]
    async fn valid_submission_writes_a_pending_slot() {
        let app = Uuid::new_v4();
        let v = viewer();
        let store = MemorySponsorStore {
            owned: vec![app],
            ..Default::default()
        };
        let blobs = MemoryBlobStore::default();
        let submit = SubmitSponsorship::new(&store, &blobs);

        let slot = submit
            .execute(Some(&v), form(app, date(2024, 6, 3)), today())
            .await
            .unwrap();

        assert_eq!(slot.status, SlotStatus::Pending);
        assert_eq!(slot.start_date, date(2024, 6, 3));
        assert_eq!(slot.end_date, date(2024, 6, 9));
        assert!(slot.banner_url.starts_with("https://cdn.example.com/sponsor-banners/"));
        assert_eq!(store.inserted.lock().unwrap().len(), 1);
        assert_eq!(blobs.uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn booked_week_is_rejected_before_any_upload() {
        // The week of 2024-06-03 already has a paid slot.
        let app = Uuid::new_v4();
        let v = viewer();
        let store = MemorySponsorStore {
            owned: vec![app],
            booked: vec![date(2024, 6, 3)],
            ..Default::default()
        };
        let blobs = MemoryBlobStore::default();
        let submit = SubmitSponsorship::new(&store, &blobs);

        let err = submit
            .execute(Some(&v), form(app, date(2024, 6, 3)), today())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::WeekBooked));
        assert_eq!(store.inserted.lock().unwrap().len(), 0);
        assert_eq!(blobs.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_monday_start_is_rejected_before_submission() {
        // 2024-05-28 is a Tuesday.
        let app = Uuid::new_v4();
        let v = viewer();
        let store = MemorySponsorStore {
            owned: vec![app],
            ..Default::default()
        };
        let blobs = MemoryBlobStore::default();
        let submit = SubmitSponsorship::new(&store, &blobs);

        let err = submit
            .execute(Some(&v), form(app, date(2024, 5, 28)), today())
            .await
            .unwrap_err();

        match err {
            AppError::Validation { field, message } => {
                assert_eq!(field, "start_date");
                assert!(message.contains("Monday"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.inserted.lock().unwrap().len(), 0);
        assert_eq!(blobs.uploads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn blackout_date_is_rejected_regardless_of_weekday() {
        let app = Uuid::new_v4();
        let err = validate_request(
            &form(app, blackout_week()),
            today(),
            &[app],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "start_date"));
    }

    #[test]
    fn svg_banner_is_rejected() {
        let app = Uuid::new_v4();
        let mut f = form(app, date(2024, 6, 3));
        f.banner = Some(ImageUpload {
            file_name: "banner.svg".into(),
            content_type: "image/svg+xml".into(),
            bytes: vec![1, 2, 3],
        });
        let err = validate_request(&f, today(), &[app], &[]).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "banner"));
    }

    #[test]
    fn missing_app_selection_is_rejected() {
        let mut f = form(Uuid::new_v4(), date(2024, 6, 3));
        f.app_id = None;
        let err = validate_request(&f, today(), &[], &[]).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "app_id"));
    }

    #[test]
    fn foreign_app_is_rejected() {
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        let err = validate_request(&form(theirs, date(2024, 6, 3)), today(), &[mine], &[])
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "app_id"));
    }

    #[test]
    fn past_weeks_are_rejected() {
        let app = Uuid::new_v4();
        let err = validate_request(
            &form(app, date(2024, 6, 3)),
            date(2024, 6, 10),
            &[app],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "start_date"));
    }

    #[tokio::test]
    async fn insert_failure_after_upload_leaves_the_blob_orphaned() {
        // Accepted leak: no rollback of the multi-step submit.
        let app = Uuid::new_v4();
        let v = viewer();
        let store = MemorySponsorStore {
            owned: vec![app],
            ..Default::default()
        };
        store.fail_insert.store(true, Ordering::SeqCst);
        let blobs = MemoryBlobStore::default();
        let submit = SubmitSponsorship::new(&store, &blobs);

        let err = submit
            .execute(Some(&v), form(app, date(2024, 6, 3)), today())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Backend(_)));
        assert_eq!(blobs.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(store.inserted.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn availability_marks_booked_weeks() {
        let store = MemorySponsorStore {
            booked: vec![date(2024, 6, 10)],
            ..Default::default()
        };
        let blobs = MemoryBlobStore::default();
        let submit = SubmitSponsorship::new(&store, &blobs);

        let table = submit.availability().await.unwrap();
        let booked: Vec<_> = table.iter().filter(|w| w.booked).collect();
        assert_eq!(booked.len(), 1);
        assert_eq!(booked[0].week.start, date(2024, 6, 10));
    }

    #[tokio::test]
    async fn anonymous_submission_is_rejected() {
        let store = MemorySponsorStore::default();
        let blobs = MemoryBlobStore::default();
        let submit = SubmitSponsorship::new(&store, &blobs);

        let err = submit
            .execute(None, form(Uuid::new_v4(), date(2024, 6, 3)), today())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }
}
