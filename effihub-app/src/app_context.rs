use std::sync::Arc;

use effihub_errors::AppError;
use sea_orm::DatabaseConnection;

use crate::application::{
    FeaturedRanking, SubmitApp, SubmitSponsorship, ToggleUpvote, FEATURED_LIMIT,
};
use crate::infrastructure::auth::GoogleOAuth;
use crate::infrastructure::cache::QueryCache;
use crate::infrastructure::db::{
    create_connection, run_migrations, AppRepository, CategoryRepository, ProfileRepository,
    SponsorshipRepository, UpvoteRepository,
};
use crate::infrastructure::realtime::UpvoteFeed;
use crate::infrastructure::storage::LocalMediaStore;

#[derive(Clone)]
pub struct AppContext {
    pub apps: AppRepository,
    pub categories: CategoryRepository,
    pub profiles: ProfileRepository,
    pub sponsorships: SponsorshipRepository,
    pub upvotes: UpvoteRepository,
    pub feed: UpvoteFeed,
    pub cache: QueryCache,
    pub featured: Arc<FeaturedRanking>,
    pub media: LocalMediaStore,
    pub oauth: Option<GoogleOAuth>,
}

impl AppContext {
    pub fn new(
        db: DatabaseConnection,
        media: LocalMediaStore,
        oauth: Option<GoogleOAuth>,
    ) -> Self {
        Self {
            apps: AppRepository::new(db.clone()),
            categories: CategoryRepository::new(db.clone()),
            profiles: ProfileRepository::new(db.clone()),
            sponsorships: SponsorshipRepository::new(db.clone()),
            upvotes: UpvoteRepository::new(db),
            feed: UpvoteFeed::new(),
            cache: QueryCache::new(),
            featured: Arc::new(FeaturedRanking::new()),
            media,
            oauth,
        }
    }

    pub async fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let db = create_connection(&database_url)
            .await
            .expect("failed to connect to database");
        run_migrations(&db).await.expect("migrations failed");

        let media_root =
            std::env::var("MEDIA_DIR").unwrap_or_else(|_| "media".to_string());
        let public_base = std::env::var("PUBLIC_MEDIA_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000/media".to_string());
        let media = LocalMediaStore::new(media_root, public_base);

        let oauth = match (
            std::env::var("GOOGLE_CLIENT_ID"),
            std::env::var("GOOGLE_CLIENT_SECRET"),
            std::env::var("GOOGLE_REDIRECT_URI"),
        ) {
            (Ok(id), Ok(secret), Ok(redirect)) => Some(
                GoogleOAuth::new(&id, &secret, &redirect).expect("invalid Google OAuth config"),
            ),
            _ => {
                tracing::warn!("Google OAuth not configured; sign-in is disabled");
                None
            }
        };

        Self::new(db, media, oauth)
    }

    /// One click of the upvote button, wired to the real store and feed.
    pub fn toggle_upvote(&self) -> ToggleUpvote<UpvoteRepository> {
        ToggleUpvote::new(self.upvotes.clone(), self.feed.clone(), self.cache.clone())
    }

    pub fn submit_app(&self) -> SubmitApp<AppRepository, LocalMediaStore> {
        SubmitApp::new(self.apps.clone(), self.media.clone())
    }

    pub fn submit_sponsorship(&self) -> SubmitSponsorship<SponsorshipRepository, LocalMediaStore> {
        SubmitSponsorship::new(self.sponsorships.clone(), self.media.clone())
    }

    /// Re-query the top apps and swap the featured ranking.
    pub async fn refresh_featured(&self) -> Result<(), AppError> {
        let top = self.apps.top_summaries(FEATURED_LIMIT).await?;
        self.featured.refresh(top);
        Ok(())
    }
}
