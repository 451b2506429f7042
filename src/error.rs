use thiserror::Error;

/// Programmer-error surface of the crate. Malformed statement *data* never
/// shows up here — it is reported inside `ParseResult` instead.
#[derive(Error, Debug)]
pub enum ExtratoError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate profile id: {0}")]
    DuplicateProfile(String),

    #[error("profile '{0}' has no matchers")]
    NoMatchers(String),

    #[error("profile '{0}': {1}")]
    InvalidColumnMap(String, String),

    #[error("profile '{0}': invalid matcher pattern '{1}': {2}")]
    InvalidPattern(String, String, #[source] regex::Error),
}

pub type Result<T> = std::result::Result<T, ExtratoError>;
