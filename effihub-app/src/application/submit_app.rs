use effihub_errors::AppError;
use uuid::Uuid;

use crate::application::image_upload::{validate_image, ImageUpload};
use crate::application::link_check::LinkCheck;
use crate::application::submit_sponsorship::BlobStore;
use crate::domain::{AppSummary, NewApp, Platform, Viewer};

/// Showcase gallery size limit per listing.
pub const MAX_SCREENSHOTS: usize = 4;

/// An unvalidated listing submission as it leaves the submit-app form. The
/// logo and screenshots arrive as file uploads, never as URLs.
#[derive(Debug, Clone)]
pub struct AppSubmission {
    pub name: String,
    pub slogan: String,
    pub description: String,
    pub app_link: String,
    pub platform: Platform,
    pub category_id: Option<Uuid>,
    pub logo: Option<ImageUpload>,
    pub screenshots: Vec<ImageUpload>,
}

/// Storage writes a new listing needs: the app row and its gallery rows.
pub trait ListingStore {
    fn insert_app(
        &self,
        user_id: Uuid,
        new_app: NewApp,
    ) -> impl std::future::Future<Output = Result<AppSummary, AppError>> + Send;

    /// Attach screenshot URLs to an app, preserving the given order.
    fn add_images(
        &self,
        app_id: Uuid,
        image_urls: Vec<String>,
    ) -> impl std::future::Future<Output = Result<(), AppError>> + Send;
}

pub fn validate_submission(form: &AppSubmission) -> Result<(), AppError> {
    if form.name.trim().is_empty() {
        return Err(AppError::validation("name", "App name is required"));
    }
    if form.slogan.trim().is_empty() {
        return Err(AppError::validation("slogan", "Slogan is required"));
    }
    LinkCheck::validate("app_link", &form.app_link)?;
    if form.category_id.is_none() {
        return Err(AppError::validation(
            "category_id",
            "Please select a category",
        ));
    }

    let logo = form
        .logo
        .as_ref()
        .ok_or_else(|| AppError::validation("logo", "Logo image is required"))?;
    validate_image("logo", logo)?;

    if form.screenshots.is_empty() {
        return Err(AppError::validation(
            "screenshots",
            "At least one screenshot is required",
        ));
    }
    if form.screenshots.len() > MAX_SCREENSHOTS {
        return Err(AppError::validation(
            "screenshots",
            "At most four screenshots are allowed",
        ));
    }
    for screenshot in &form.screenshots {
        validate_image("screenshots", screenshot)?;
    }

    Ok(())
}

/// Handles a listing submission: validates the form, uploads the logo and
/// screenshots through blob storage, and writes the app plus its gallery
/// rows.
pub struct SubmitApp<S: ListingStore, B: BlobStore> {
    store: S,
    blobs: B,
}

impl<S: ListingStore, B: BlobStore> SubmitApp<S, B> {
    pub fn new(store: S, blobs: B) -> Self {
        Self { store, blobs }
    }

    pub async fn execute(
        &self,
        viewer: Option<&Viewer>,
        form: AppSubmission,
    ) -> Result<AppSummary, AppError> {
        let viewer = viewer.ok_or(AppError::Unauthenticated)?;
        validate_submission(&form)?;

        let logo = form
            .logo
            .ok_or_else(|| AppError::validation("logo", "Logo image is required"))?;
        let category_id = form
            .category_id
            .ok_or_else(|| AppError::validation("category_id", "Please select a category"))?;

        let stamp = chrono::Utc::now().timestamp_millis();
        let logo_url = self
            .blobs
            .store(
                &format!("app-logos/{}_{stamp}.{}", viewer.id, logo.extension()),
                &logo.content_type,
                logo.bytes,
            )
            .await?;

        let mut image_urls = Vec::with_capacity(form.screenshots.len());
        for (index, shot) in form.screenshots.into_iter().enumerate() {
            let url = self
                .blobs
                .store(
                    &format!(
                        "app-screenshots/{}_{stamp}_{index}.{}",
                        viewer.id,
                        shot.extension()
                    ),
                    &shot.content_type,
                    shot.bytes,
                )
                .await?;
            image_urls.push(url);
        }

        let created = self
            .store
            .insert_app(
                viewer.id,
                NewApp {
                    name: form.name,
                    slogan: form.slogan,
                    description: form.description,
                    logo_url: Some(logo_url),
                    app_link: form.app_link,
                    platform: form.platform,
                    category_id,
                },
            )
            .await?;
        self.store.add_images(created.id, image_urls).await?;

        tracing::info!(app_id = %created.id, name = %created.name, "app submitted");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn viewer() -> Viewer {
        Viewer {
            id: Uuid::new_v4(),
            email: "maker@example.com".into(),
        }
    }

    fn png(name: &str) -> ImageUpload {
        ImageUpload {
            file_name: name.into(),
            content_type: "image/png".into(),
            bytes: vec![0u8; 8],
        }
    }

    fn submission() -> AppSubmission {
        AppSubmission {
            name: "Focus Timer".into(),
            slogan: "Deep work, timed".into(),
            description: "A pomodoro timer".into(),
            app_link: "https://focustimer.example.com".into(),
            platform: Platform::Pc,
            category_id: Some(Uuid::new_v4()),
            logo: Some(png("logo.png")),
            screenshots: vec![png("one.png"), png("two.png")],
        }
    }

    #[derive(Default)]
    struct MemoryListingStore {
        apps: Mutex<Vec<NewApp>>,
        images: Mutex<Vec<(Uuid, Vec<String>)>>,
    }

    impl ListingStore for &MemoryListingStore {
        async fn insert_app(&self, user_id: Uuid, new_app: NewApp) -> Result<AppSummary, AppError> {
            let summary = AppSummary {
                id: Uuid::new_v4(),
                name: new_app.name.clone(),
                slogan: new_app.slogan.clone(),
                logo_url: new_app.logo_url.clone(),
                app_link: new_app.app_link.clone(),
                platform: new_app.platform,
                category_id: new_app.category_id,
                user_id,
                upvotes_count: 0,
                created_at: None,
            };
            self.apps.lock().unwrap().push(new_app);
            Ok(summary)
        }

        async fn add_images(&self, app_id: Uuid, image_urls: Vec<String>) -> Result<(), AppError> {
            self.images.lock().unwrap().push((app_id, image_urls));
            Ok(())
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

    #[tokio::test]
    async fn submission_uploads_assets_and_writes_gallery_rows() {
        let store = MemoryListingStore::default();
        let blobs = MemoryBlobStore::default();
        let submit = SubmitApp::new(&store, &blobs);
        let v = viewer();

        let created = submit.execute(Some(&v), submission()).await.unwrap();

        // Logo plus two screenshots went through blob storage.
        assert_eq!(blobs.uploads.load(Ordering::SeqCst), 3);
        assert!(created
            .logo_url
            .as_deref()
            .unwrap()
            .starts_with("https://cdn.example.com/app-logos/"));

        let images = store.images.lock().unwrap();
        assert_eq!(images.len(), 1);
        let (app_id, urls) = &images[0];
        assert_eq!(*app_id, created.id);
        assert_eq!(urls.len(), 2);
        assert!(urls
            .iter()
            .all(|url| url.starts_with("https://cdn.example.com/app-screenshots/")));
    }

    #[tokio::test]
    async fn missing_logo_is_rejected_before_any_upload() {
        let store = MemoryListingStore::default();
        let blobs = MemoryBlobStore::default();
        let submit = SubmitApp::new(&store, &blobs);
        let v = viewer();

        let mut form = submission();
        form.logo = None;
        let err = submit.execute(Some(&v), form).await.unwrap_err();

        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "logo"));
        assert_eq!(blobs.uploads.load(Ordering::SeqCst), 0);
        assert!(store.apps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn screenshot_count_is_bounded() {
        let store = MemoryListingStore::default();
        let blobs = MemoryBlobStore::default();
        let submit = SubmitApp::new(&store, &blobs);
        let v = viewer();

        let mut none = submission();
        none.screenshots.clear();
        let err = submit.execute(Some(&v), none).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "screenshots"));

        let mut five = submission();
        five.screenshots = (0..5).map(|i| png(&format!("s{i}.png"))).collect();
        let err = submit.execute(Some(&v), five).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "screenshots"));

        assert_eq!(blobs.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn anonymous_submission_is_rejected() {
        let store = MemoryListingStore::default();
        let blobs = MemoryBlobStore::default();
        let submit = SubmitApp::new(&store, &blobs);

        let err = submit.execute(None, submission()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[test]
    fn local_links_fail_validation() {
        let mut form = submission();
        form.app_link = "http://localhost:3000".into();
        let err = validate_submission(&form).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "app_link"));
    }
}
