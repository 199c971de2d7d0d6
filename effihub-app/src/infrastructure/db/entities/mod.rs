pub mod app;
pub mod app_image;
pub mod category;
pub mod profile;
pub mod sponsored_app;
pub mod upvote;

pub use app::Entity as App;
pub use app_image::Entity as AppImage;
pub use category::Entity as Category;
pub use profile::Entity as Profile;
pub use sponsored_app::Entity as SponsoredApp;
pub use upvote::Entity as Upvote;
