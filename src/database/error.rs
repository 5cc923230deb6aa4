use std::fmt::{self, Display};

use thiserror::Error;
use warp::http::StatusCode;

#[derive(Debug, Clone)]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(e),
            sqlx::Error::RowNotFound => Self::new("RowNotFound".to_owned()),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(e),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new("Pool timed out".to_owned()),
            sqlx::Error::PoolClosed => Self::new("Pool closed".to_owned()),
            sqlx::Error::WorkerCrashed => Self::new("Worker crashed".to_owned()),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            e => Self::new(format!("Unknown error ({e})")),
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query failed ({})", self.info)
    }
}

impl std::error::Error for QueryError {}

/// Every failure an operation of this crate can report.
///
/// The first group comes from recipe validation, the second from lookups and
/// relation toggles, the rest from the request surface and the store.
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("Add at least one ingredient")]
    MissingIngredients,
    #[error("Amount of ingredient {ingredient_id} must be a number greater than 0 (got {amount})")]
    NonPositiveAmount { ingredient_id: i64, amount: String },
    #[error("Ingredient {0} must not be repeated in a recipe")]
    DuplicateIngredient(i64),
    #[error("Invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    #[error("Tag {0} doesn't exist")]
    TagNotFound(i64),
    #[error("Ingredient {0} doesn't exist")]
    IngredientNotFound(i64),
    #[error("No recipe exists with id {0}")]
    RecipeNotFound(i64),
    #[error("No user exists with id {0}")]
    UserNotFound(i64),
    #[error("Entry already exists")]
    AlreadyExists,
    #[error("Entry doesn't exist")]
    NotFound,
    #[error("You can't subscribe to yourself")]
    SelfFollowForbidden,

    #[error("Invalid session; {0}")]
    Unauthorized(&'static str),
    #[error("You don't have permission to perform this action")]
    Forbidden,

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl From<sqlx::Error> for RecipeError {
    fn from(value: sqlx::Error) -> Self {
        Self::Query(QueryError::from(value))
    }
}

impl RecipeError {
    pub fn status(&self) -> StatusCode {
        match self {
            RecipeError::MissingIngredients
            | RecipeError::NonPositiveAmount { .. }
            | RecipeError::DuplicateIngredient(_)
            | RecipeError::InvalidField { .. }
            | RecipeError::TagNotFound(_)
            | RecipeError::IngredientNotFound(_)
            | RecipeError::AlreadyExists
            | RecipeError::SelfFollowForbidden => StatusCode::BAD_REQUEST,
            RecipeError::RecipeNotFound(_) | RecipeError::UserNotFound(_) | RecipeError::NotFound => {
                StatusCode::NOT_FOUND
            }
            RecipeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RecipeError::Forbidden => StatusCode::FORBIDDEN,
            RecipeError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl warp::reject::Reject for RecipeError {}
