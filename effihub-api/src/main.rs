use std::convert::Infallible;

use axum::{
    extract::{Multipart, Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use effihub_app::application::{
    sponsor_calendar, AppSubmission, ImageUpload, SponsorshipForm, VoteLedger, WeekAvailability,
};
use effihub_app::domain::{
    AppSummary, AppWithDetails, CategoryWithCount, CurrentSponsor, Platform, Viewer, VoteToggle,
};
use effihub_app::infrastructure::cache::QueryCache;
use effihub_app::AppContext;
use effihub_errors::AppError;
use oauth2::PkceCodeVerifier;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};
use uuid::Uuid;

const SESSION_USER_KEY: &str = "user_id";
const SESSION_CSRF_KEY: &str = "oauth_csrf";
const SESSION_PKCE_KEY: &str = "oauth_pkce";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let ctx = AppContext::from_env().await;
    if let Err(err) = ctx.refresh_featured().await {
        tracing::warn!(error = %err, "initial featured refresh failed");
    }

    let media_root = std::env::var("MEDIA_DIR").unwrap_or_else(|_| "media".to_string());

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(7)));

    let app = Router::new()
        .route("/api/apps/featured", get(featured_apps))
        .route("/api/apps/top", get(top_ranked))
        .route("/api/apps/new", get(new_apps))
        .route("/api/apps", post(submit_app))
        .route("/api/apps/{id}", get(app_detail))
        .route("/api/apps/{id}/vote", post(toggle_vote))
        .route("/api/apps/{id}/upvotes/events", get(upvote_events))
        .route("/api/search", get(search_apps))
        .route("/api/categories", get(list_categories))
        .route("/api/categories/{slug}/apps", get(category_apps))
        .route("/api/me/apps", get(my_apps))
        .route("/api/sponsorships/weeks", get(sponsorship_weeks))
        .route("/api/sponsorships/current", get(current_sponsor))
        .route("/api/sponsorships", post(submit_sponsorship))
        .route("/api/me", get(me))
        .route("/auth/google", get(auth_redirect))
        .route("/auth/callback", get(auth_callback))
        .route("/auth/logout", post(logout))
        .route("/healthz", get(|| async { "ok" }))
        .nest_service("/media", ServeDir::new(media_root))
        .layer(session_layer)
        .layer(CompressionLayer::new())
        .with_state(ctx);

    let addr = std::env::var("HUB_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}

/// Resolve the authenticated actor from the session, if any.
async fn current_viewer(ctx: &AppContext, session: &Session) -> Result<Option<Viewer>, AppError> {
    let user_id: Option<Uuid> = session
        .get(SESSION_USER_KEY)
        .await
        .map_err(|err| AppError::Backend(err.to_string()))?;
    let Some(user_id) = user_id else {
        return Ok(None);
    };
    let profile = ctx.profiles.find_by_id(user_id).await?;
    Ok(profile.map(|p| Viewer {
        id: p.id,
        email: p.email,
    }))
}

fn viewer_suffix(viewer: &Option<Viewer>) -> String {
    viewer
        .as_ref()
        .map(|v| v.id.to_string())
        .unwrap_or_else(|| "anon".to_string())
}

/// Serve a listing out of the query cache, or run the query and fill it.
async fn cached<F, T>(
    cache: &QueryCache,
    key: String,
    load: F,
) -> Result<Json<serde_json::Value>, AppError>
where
    F: std::future::Future<Output = Result<T, AppError>>,
    T: serde::Serialize,
{
    if let Some(hit) = cache.get(&key) {
        return Ok(Json(hit));
    }
    let fresh = load.await?;
    let value =
        serde_json::to_value(&fresh).map_err(|err| AppError::Backend(err.to_string()))?;
    cache.put(key, value.clone());
    Ok(Json(value))
}

async fn featured_apps(State(ctx): State<AppContext>) -> Json<Vec<AppSummary>> {
    Json(ctx.featured.top())
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<u64>,
}

async fn top_ranked(
    State(ctx): State<AppContext>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let viewer = current_viewer(&ctx, &session).await?;
    let limit = query.limit.unwrap_or(100);
    let key = QueryCache::key("top-ranked-page", &format!("{}:{limit}", viewer_suffix(&viewer)));
    let viewer_id = viewer.map(|v| v.id);
    cached(&ctx.cache, key, async {
        ctx.apps.top_ranked(limit, viewer_id).await
    })
    .await
}

async fn new_apps(
    State(ctx): State<AppContext>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let viewer = current_viewer(&ctx, &session).await?;
    let limit = query.limit.unwrap_or(30);
    let key = QueryCache::key("new-apps-page", &format!("{}:{limit}", viewer_suffix(&viewer)));
    let viewer_id = viewer.map(|v| v.id);
    cached(&ctx.cache, key, async {
        ctx.apps.newest(limit, viewer_id).await
    })
    .await
}

#[derive(serde::Serialize)]
struct AppDetailResponse {
    #[serde(flatten)]
    app: AppWithDetails,
    /// 1-based position in the featured strip, when the app made the cut.
    featured_rank: Option<usize>,
}

async fn app_detail(
    State(ctx): State<AppContext>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<AppDetailResponse>, AppError> {
    let viewer = current_viewer(&ctx, &session).await?;
    let details = ctx
        .apps
        .find_with_details(id, viewer.map(|v| v.id))
        .await?
        .ok_or_else(|| AppError::NotFound("app".to_string()))?;
    Ok(Json(AppDetailResponse {
        featured_rank: ctx.featured.rank_of(id),
        app: details,
    }))
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
}

async fn search_apps(
    State(ctx): State<AppContext>,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let viewer = current_viewer(&ctx, &session).await?;
    let key = QueryCache::key("search", &format!("{}:{}", viewer_suffix(&viewer), query.q));
    let viewer_id = viewer.map(|v| v.id);
    cached(&ctx.cache, key, async {
        ctx.apps.search(&query.q, viewer_id).await
    })
    .await
}

async fn list_categories(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<CategoryWithCount>>, AppError> {
    Ok(Json(ctx.categories.list_with_counts().await?))
}

async fn category_apps(
    State(ctx): State<AppContext>,
    session: Session,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let viewer = current_viewer(&ctx, &session).await?;
    let category = ctx
        .categories
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("category".to_string()))?;
    let key = QueryCache::key("category-apps", &format!("{}:{slug}", viewer_suffix(&viewer)));
    let viewer_id = viewer.map(|v| v.id);
    cached(&ctx.cache, key, async {
        ctx.apps.by_category(category.id, viewer_id).await
    })
    .await
}

/// Read one multipart file field into an upload.
async fn image_field(field: axum::extract::multipart::Field<'_>) -> Result<ImageUpload, AppError> {
    let name = field.name().unwrap_or("file").to_string();
    let content_type = field.content_type().unwrap_or_default().to_string();
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|err| AppError::validation(&name, err.to_string()))?;
    Ok(ImageUpload {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    })
}

/// New listing submission: text fields plus a required logo and 1-4
/// screenshot uploads, all in one multipart form.
async fn submit_app(
    State(ctx): State<AppContext>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Json<AppSummary>, AppError> {
    let viewer = current_viewer(&ctx, &session).await?;

    let mut form = AppSubmission {
        name: String::new(),
        slogan: String::new(),
        description: String::new(),
        app_link: String::new(),
        platform: Platform::Pc,
        category_id: None,
        logo: None,
        screenshots: Vec::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::validation("form", err.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "name" => {
                form.name = field
                    .text()
                    .await
                    .map_err(|err| AppError::validation("name", err.to_string()))?;
            }
            "slogan" => {
                form.slogan = field
                    .text()
                    .await
                    .map_err(|err| AppError::validation("slogan", err.to_string()))?;
            }
            "description" => {
                form.description = field
                    .text()
                    .await
                    .map_err(|err| AppError::validation("description", err.to_string()))?;
            }
            "app_link" => {
                form.app_link = field
                    .text()
                    .await
                    .map_err(|err| AppError::validation("app_link", err.to_string()))?;
            }
            "platform" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::validation("platform", err.to_string()))?;
                form.platform = Platform::parse(&text);
            }
            "category_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::validation("category_id", err.to_string()))?;
                form.category_id = Some(text.parse().map_err(|_| {
                    AppError::validation("category_id", "Please select a category")
                })?);
            }
            "logo" => form.logo = Some(image_field(field).await?),
            "screenshots" => form.screenshots.push(image_field(field).await?),
            _ => {}
        }
    }

    let created = ctx.submit_app().execute(viewer.as_ref(), form).await?;
    ctx.cache.invalidate_family("new-apps-page");
    Ok(Json(created))
}

/// One upvote-button click. The ledger is seeded from current storage state
/// so the duplicate-conflict fallback and the count arithmetic behave the
/// same as a long-lived client ledger.
async fn toggle_vote(
    State(ctx): State<AppContext>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<VoteToggle>, AppError> {
    let viewer = current_viewer(&ctx, &session)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    let summary = ctx
        .apps
        .find_summary(id)
        .await?
        .ok_or_else(|| AppError::NotFound("app".to_string()))?;
    let is_upvoted = ctx.upvotes.exists(id, viewer.id).await?;

    let mut ledger = VoteLedger::new(id, Some(viewer.id), summary.upvotes_count, is_upvoted);
    let result = ctx.toggle_upvote().execute(&mut ledger).await?;

    // Vote counts drive the featured strip; refresh failures just leave the
    // previous ranking standing.
    if let Err(err) = ctx.refresh_featured().await {
        tracing::warn!(error = %err, "featured refresh failed");
    }

    Ok(Json(result))
}

/// Per-app change feed bridged onto SSE. Dropping the connection drops the
/// broadcast receiver, which is the unsubscribe.
async fn upvote_events(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = ctx.feed.subscribe(id);
    let stream = BroadcastStream::new(rx).filter_map(|event| match event {
        Ok(change) => Event::default()
            .event("upvote")
            .json_data(&change)
            .ok()
            .map(Ok),
        // A lagged receiver missed events; the client refetches on its own.
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// The user's own apps, for the sponsorship form's app selector.
async fn my_apps(
    State(ctx): State<AppContext>,
    session: Session,
) -> Result<Json<Vec<AppSummary>>, AppError> {
    let viewer = current_viewer(&ctx, &session)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    Ok(Json(ctx.apps.owned_by(viewer.id).await?))
}

#[derive(serde::Serialize)]
struct SponsorWeeksResponse {
    price_usd: u32,
    weeks: Vec<WeekAvailability>,
}

async fn sponsorship_weeks(
    State(ctx): State<AppContext>,
) -> Result<Json<SponsorWeeksResponse>, AppError> {
    Ok(Json(SponsorWeeksResponse {
        price_usd: sponsor_calendar::SPONSOR_PRICE_USD,
        weeks: ctx.submit_sponsorship().availability().await?,
    }))
}

async fn current_sponsor(
    State(ctx): State<AppContext>,
) -> Result<Json<Option<CurrentSponsor>>, AppError> {
    let today = Utc::now().date_naive();
    Ok(Json(ctx.sponsorships.current_sponsor(today).await?))
}

async fn submit_sponsorship(
    State(ctx): State<AppContext>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Json<effihub_app::domain::SponsorshipSlot>, AppError> {
    let viewer = current_viewer(&ctx, &session).await?;

    let mut app_id: Option<Uuid> = None;
    let mut start_date: Option<NaiveDate> = None;
    let mut message: Option<String> = None;
    let mut banner: Option<ImageUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::validation("form", err.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "app_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::validation("app_id", err.to_string()))?;
                app_id = Some(
                    text.parse()
                        .map_err(|_| AppError::validation("app_id", "Please select an app"))?,
                );
            }
            "start_date" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::validation("start_date", err.to_string()))?;
                start_date = Some(NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(
                    |_| AppError::validation("start_date", "Please select a start date"),
                )?);
            }
            "message" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::validation("message", err.to_string()))?;
                if !text.trim().is_empty() {
                    message = Some(text);
                }
            }
            "banner" => banner = Some(image_field(field).await?),
            _ => {}
        }
    }

    let start_date = start_date
        .ok_or_else(|| AppError::validation("start_date", "Please select a start date"))?;
    let form = SponsorshipForm {
        app_id,
        start_date,
        message,
        banner,
    };

    let slot = ctx
        .submit_sponsorship()
        .execute(viewer.as_ref(), form, Utc::now().date_naive())
        .await?;
    Ok(Json(slot))
}

async fn me(
    State(ctx): State<AppContext>,
    session: Session,
) -> Result<Json<Option<Viewer>>, AppError> {
    Ok(Json(current_viewer(&ctx, &session).await?))
}

async fn auth_redirect(
    State(ctx): State<AppContext>,
    session: Session,
) -> Result<Redirect, AppError> {
    let oauth = ctx
        .oauth
        .as_ref()
        .ok_or_else(|| AppError::Backend("sign-in is not configured".to_string()))?;

    let (url, csrf, pkce) = oauth.authorize_url();
    session
        .insert(SESSION_CSRF_KEY, csrf.secret().to_string())
        .await
        .map_err(|err| AppError::Backend(err.to_string()))?;
    session
        .insert(SESSION_PKCE_KEY, pkce.secret().to_string())
        .await
        .map_err(|err| AppError::Backend(err.to_string()))?;

    Ok(Redirect::temporary(&url))
}

#[derive(Deserialize)]
struct AuthCallback {
    code: String,
    state: String,
}

async fn auth_callback(
    State(ctx): State<AppContext>,
    session: Session,
    Query(callback): Query<AuthCallback>,
) -> Result<Redirect, AppError> {
    let oauth = ctx
        .oauth
        .as_ref()
        .ok_or_else(|| AppError::Backend("sign-in is not configured".to_string()))?;

    let expected_csrf: Option<String> = session
        .get(SESSION_CSRF_KEY)
        .await
        .map_err(|err| AppError::Backend(err.to_string()))?;
    if expected_csrf.as_deref() != Some(callback.state.as_str()) {
        return Err(AppError::validation("state", "Sign-in session expired"));
    }

    let pkce_secret: String = session
        .get(SESSION_PKCE_KEY)
        .await
        .map_err(|err| AppError::Backend(err.to_string()))?
        .ok_or_else(|| AppError::validation("state", "Sign-in session expired"))?;

    let info = oauth
        .exchange_code(&callback.code, PkceCodeVerifier::new(pkce_secret))
        .await?;
    let profile = ctx.profiles.upsert(&info.into_profile()).await?;

    session
        .insert(SESSION_USER_KEY, profile.id)
        .await
        .map_err(|err| AppError::Backend(err.to_string()))?;
    session.remove::<String>(SESSION_CSRF_KEY).await.ok();
    session.remove::<String>(SESSION_PKCE_KEY).await.ok();

    tracing::info!(user = %profile.id, "user signed in");
    Ok(Redirect::temporary("/"))
}

async fn logout(session: Session) -> Result<Json<serde_json::Value>, AppError> {
    session
        .flush()
        .await
        .map_err(|err| AppError::Backend(err.to_string()))?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
