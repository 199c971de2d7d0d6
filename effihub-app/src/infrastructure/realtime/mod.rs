mod upvote_feed;

pub use upvote_feed::UpvoteFeed;
