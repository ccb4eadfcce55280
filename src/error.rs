use thiserror::Error;

/// Top-level error type returned by every fallible operation in this crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    InvalidDocument(#[from] InvalidDocumentError),
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("document `{0}` not found")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("search was cancelled")]
    Cancelled,
    #[error("internal: {0}")]
    Internal(#[from] InternalError),
}

/// Errors caused by the caller feeding the engine bad input.
#[derive(Error, Debug)]
pub enum InvalidDocumentError {
    #[error("document is missing the `documentID` field")]
    MissingDocumentId,
    #[error("`documentID` must be a string, found {found}")]
    WrongDocumentIdType { found: &'static str },
    #[error("`documentID` is empty after trimming whitespace")]
    EmptyDocumentId,
    #[error("searchable field `{field}` must be a string or an array, found {found}")]
    WrongSearchableFieldType { field: String, found: &'static str },
}

/// Errors that indicate a broken invariant in the engine itself rather than
/// bad caller input. Surfacing one of these means a bug.
#[derive(Error, Debug)]
pub enum InternalError {
    #[error("internal id {0} has no matching document body")]
    DanglingInternalId(u32),
    #[error("posting list for token `{0}` is empty but present in the index")]
    EmptyPostingList(String),
    #[error(transparent)]
    ThreadPoolBuild(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
