mod featured_ranking;
mod image_upload;
mod link_check;
pub mod sponsor_calendar;
mod submit_app;
mod submit_sponsorship;
mod toggle_upvote;
mod vote_ledger;

pub use featured_ranking::{FeaturedRanking, FEATURED_LIMIT};
pub use image_upload::{validate_image, ImageUpload, ALLOWED_IMAGE_TYPES};
pub use link_check::LinkCheck;
pub use submit_app::{
    validate_submission, AppSubmission, ListingStore, SubmitApp, MAX_SCREENSHOTS,
};
pub use submit_sponsorship::{
    validate_request, BlobStore, SponsorStore, SponsorshipForm, SubmitSponsorship,
    WeekAvailability,
};
pub use toggle_upvote::{ToggleUpvote, VoteStore};
pub use vote_ledger::{Intended, VoteCommand, VoteLedger, VoteState, WriteOutcome};
