use serde::{Deserialize, Serialize};

/// One row of the upvotes table as carried by a change-feed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpvoteRow {
    pub app_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
}

/// A single change pushed on an app's upvote channel.
///
/// Events are self-describing: the client applies each one as an absolute
/// correction and never has to diff state against the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "row", rename_all = "lowercase")]
pub enum UpvoteEvent {
    Inserted(UpvoteRow),
    Deleted(UpvoteRow),
}

impl UpvoteEvent {
    pub fn row(&self) -> &UpvoteRow {
        match self {
            Self::Inserted(row) | Self::Deleted(row) => row,
        }
    }

    pub fn app_id(&self) -> uuid::Uuid {
        self.row().app_id
    }
}
