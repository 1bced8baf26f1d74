use crate::models::{Category, RatingKind};
use axum::http::StatusCode;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<DraftError> for AppError {
    fn from(err: DraftError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

/// Reasons a draft mutation is refused. A refused mutation never changes the draft.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftError {
    MoodScoreOutOfRange(u8),
    SleepHoursOutOfRange(f32),
    EmptyItemName,
    DuplicateItem { category: Category, id: String },
    ItemNotFound { category: Category, id: String },
    /// The category does not carry this kind of rating.
    RatingKindMismatch {
        category: Category,
        expected: RatingKind,
        found: RatingKind,
    },
    /// Ratings only apply to completed items.
    ItemNotCompleted { category: Category, id: String },
}

impl std::fmt::Display for DraftError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DraftError::MoodScoreOutOfRange(score) => {
                write!(f, "mood score must be between 1 and 10, got {score}")
            }
            DraftError::SleepHoursOutOfRange(hours) => {
                write!(f, "sleep hours must be between 0 and 24, got {hours}")
            }
            DraftError::EmptyItemName => write!(f, "item name must not be empty"),
            DraftError::DuplicateItem { category, id } => {
                write!(f, "{category} already has an item with id '{id}'")
            }
            DraftError::ItemNotFound { category, id } => {
                write!(f, "{category} has no item with id '{id}'")
            }
            DraftError::RatingKindMismatch {
                category,
                expected,
                found,
            } => write!(f, "{category} items take {expected} ratings, not {found}"),
            DraftError::ItemNotCompleted { category, id } => {
                write!(f, "{category} item '{id}' must be completed before it can be rated")
            }
        }
    }
}

impl std::error::Error for DraftError {}
