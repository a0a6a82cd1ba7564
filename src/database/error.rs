use std::fmt::{self, Display};

use potion::HtmlError;

/// Builds a `potion::Error` with the given status code and message.
macro_rules! html_error {
    ($code:expr, $info:expr) => {
        potion::Error {
            code: $code,
            info: Some($info),
            redirect: None,
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    Internal,
    UniqueViolation,
    CheckViolation,
    ForeignKeyViolation,
}

#[derive(Debug)]
pub struct QueryError {
    info: String,
    kind: QueryErrorKind,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            kind: QueryErrorKind::Internal,
        }
    }

    pub fn kind(&self) -> QueryErrorKind {
        self.kind
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                let kind = if e.is_unique_violation() {
                    QueryErrorKind::UniqueViolation
                } else if e.is_check_violation() {
                    QueryErrorKind::CheckViolation
                } else if e.is_foreign_key_violation() {
                    QueryErrorKind::ForeignKeyViolation
                } else {
                    QueryErrorKind::Internal
                };

                Self {
                    info: format!("{e}"),
                    kind,
                }
            }
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::AnyDriverError(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(format!("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(format!("Unknown error")),
        }
    }
}

impl From<QueryError> for potion::Error {
    fn from(value: QueryError) -> Self {
        match value.kind {
            QueryErrorKind::UniqueViolation => html_error!(409, value.info),
            QueryErrorKind::CheckViolation => html_error!(400, value.info),
            QueryErrorKind::ForeignKeyViolation => html_error!(400, value.info),
            QueryErrorKind::Internal => {
                log::error!("Query failed: {}", value.info);
                html_error!(500, value.info)
            }
        }
    }
}

/// Domain failures of recipe, relationship and account operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecipeError {
    /// Input breaks a business rule. Scoped to the offending field.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// A uniqueness rule rejected the write.
    #[error("{0}")]
    Conflict(String),

    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Both entities exist but the relationship between them does not.
    #[error("{0}")]
    NotPresent(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Could not generate a unique short link in {attempts} attempts")]
    ShortLinkExhausted { attempts: usize },
}

impl RecipeError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            RecipeError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<RecipeError> for potion::Error {
    fn from(value: RecipeError) -> Self {
        let info = value.to_string();
        match value {
            RecipeError::Validation { .. } => html_error!(400, info),
            RecipeError::Conflict(_) => html_error!(409, info),
            RecipeError::NotFound(_) => html_error!(404, info),
            RecipeError::NotPresent(_) => html_error!(400, info),
            RecipeError::Forbidden(_) => html_error!(403, info),
            RecipeError::ShortLinkExhausted { .. } => {
                log::error!("{info}");
                html_error!(500, info)
            }
        }
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for potion::Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_validation_message_is_field_scoped() {
        let error =
            RecipeError::validation("ingredients", "Duplicate ingredients are not allowed.");
        assert_eq!(error.field(), Some("ingredients"));
        assert_eq!(
            error.to_string(),
            "ingredients: Duplicate ingredients are not allowed."
        );
    }

    #[rstest]
    #[case(RecipeError::validation("tags", "empty"), 400)]
    #[case(RecipeError::Conflict("Recipe is already in favorites.".into()), 409)]
    #[case(RecipeError::NotFound("No recipe exists with specified id".into()), 404)]
    #[case(RecipeError::NotPresent("Recipe is not in favorites.".into()), 400)]
    #[case(RecipeError::Forbidden("Only the author may edit".into()), 403)]
    #[case(RecipeError::ShortLinkExhausted { attempts: 16 }, 500)]
    fn test_status_codes(#[case] error: RecipeError, #[case] code: u16) {
        let info = error.to_string();
        let html: potion::Error = error.into();
        assert_eq!(html.code as u16, code);
        assert_eq!(html.info, Some(info));
    }

    #[rstest]
    #[case(sqlx::Error::RowNotFound)]
    #[case(sqlx::Error::PoolTimedOut)]
    fn test_driver_errors_are_internal(#[case] error: sqlx::Error) {
        let error = QueryError::from(error);
        assert_eq!(error.kind(), QueryErrorKind::Internal);

        let html: potion::Error = error.into();
        assert_eq!(html.code as u16, 500);
    }

    #[rstest]
    fn test_not_present_differs_from_validation() {
        let missing = RecipeError::NotPresent("Not subscribed.".into());
        assert_eq!(missing.field(), None);
        assert_ne!(missing, RecipeError::validation("author", "Not subscribed."));
    }
}
