use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AppError {
    #[error("sign-in required")]
    Unauthenticated,

    #[error("upvote already exists")]
    Conflict,

    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("week is already booked")]
    WeekBooked,

    #[error("{0} not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Please sign in to upvote apps".to_string(),
            Self::Conflict => "You have already upvoted this app".to_string(),
            Self::Validation { message, .. } => message.clone(),
            Self::WeekBooked => {
                "This week is already booked. Please select another week.".to_string()
            }
            Self::NotFound(what) => format!("{what} not found"),
            Self::Storage(_) => "Upload failed. Please try again.".to_string(),
            Self::Backend(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}

mod response_impl {
    use super::AppError;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;

    #[derive(serde::Serialize)]
    struct ErrorResponse {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let field = match &self {
                AppError::Validation { field, .. } => Some(field.clone()),
                _ => None,
            };
            let status = match &self {
                AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
                AppError::Conflict => StatusCode::CONFLICT,
                AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                AppError::WeekBooked => StatusCode::CONFLICT,
                AppError::NotFound(_) => StatusCode::NOT_FOUND,
                AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AppError::Backend(_) => StatusCode::BAD_GATEWAY,
            };
            let body = ErrorResponse {
                message: self.user_message(),
                field,
            };
            (status, Json(body)).into_response()
        }
    }
}
