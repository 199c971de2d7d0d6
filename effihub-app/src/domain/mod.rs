mod app_listing;
mod category;
mod feed;
mod profile;
mod sponsorship;
mod vote;

pub use app_listing::{AppSummary, AppWithDetails, NewApp, Platform};
pub use category::{Category, CategoryWithCount};
pub use feed::{UpvoteEvent, UpvoteRow};
pub use profile::{Profile, Viewer};
pub use sponsorship::{CurrentSponsor, NewSponsorship, SlotStatus, SponsorshipSlot};
pub use vote::VoteToggle;
