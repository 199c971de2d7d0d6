use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Platform {
    Pc,
    Mobile,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pc => "PC",
            Self::Mobile => "Mobile",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Mobile" => Self::Mobile,
            _ => Self::Pc,
        }
    }
}

/// A directory listing as stored, with the denormalized vote aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSummary {
    pub id: uuid::Uuid,
    pub name: String,
    pub slogan: String,
    pub logo_url: Option<String>,
    pub app_link: String,
    pub platform: Platform,
    pub category_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub upvotes_count: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Listing enriched for display: category name and the viewer's own vote
/// status. `is_upvoted` is derived per viewer, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppWithDetails {
    pub id: uuid::Uuid,
    pub name: String,
    pub slogan: String,
    pub description: String,
    pub logo_url: Option<String>,
    pub app_link: String,
    pub platform: Platform,
    pub category_name: Option<String>,
    pub upvotes_count: i64,
    pub is_upvoted: bool,
    /// Screenshot gallery, populated on the detail view; listings leave it
    /// empty rather than fetching per row.
    pub images: Vec<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A user submission from the submit-app form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApp {
    pub name: String,
    pub slogan: String,
    pub description: String,
    pub logo_url: Option<String>,
    pub app_link: String,
    pub platform: Platform,
    pub category_id: uuid::Uuid,
}
