use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::AppSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Pending,
    Paid,
    Rejected,
    Approved,
}

impl SlotStatus {
    pub const ALL: [Self; 4] = [Self::Pending, Self::Paid, Self::Rejected, Self::Approved];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Rejected => "rejected",
            Self::Approved => "approved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "rejected" => Some(Self::Rejected),
            "approved" => Some(Self::Approved),
            _ => None,
        }
    }

    /// Only paid and approved slots consume a week's capacity. Pending
    /// requests compete for it and rejected ones never held it.
    pub fn is_binding(&self) -> bool {
        matches!(self, Self::Paid | Self::Approved)
    }
}

/// A bookable 7-day sponsorship window keyed by its Monday start date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorshipSlot {
    pub id: uuid::Uuid,
    pub app_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SlotStatus,
    pub banner_url: String,
    pub message: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A validated submission, ready to be written as a pending slot.
#[derive(Debug, Clone)]
pub struct NewSponsorship {
    pub app_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub banner_url: String,
    pub message: Option<String>,
}

/// The slot currently occupying the homepage spot, joined with its app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentSponsor {
    pub slot: SponsorshipSlot,
    pub app: AppSummary,
}
