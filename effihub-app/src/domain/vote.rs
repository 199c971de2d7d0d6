use serde::{Deserialize, Serialize};

/// Result of a vote toggle, echoed back to the clicking client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteToggle {
    pub voted: bool,
    pub upvotes_count: i64,
}
