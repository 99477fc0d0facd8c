use thiserror::Error;

/// Errors raised while configuring or feeding a [`NestedRegistrie`](crate::NestedRegistrie).
///
/// Validation variants carry the JSON path of the offending value, rooted at
/// `$` for the value handed to `register`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("entry at `{path}` must be an object, found {found}")]
    NotAnObject { path: String, found: &'static str },
    #[error("entry at `{path}` is missing key field `{field}`")]
    MissingKeyField { path: String, field: String },
    #[error("key field `{field}` at `{path}` must be a string, number or boolean")]
    KeyNotScalar { path: String, field: String },
    #[error("children field `{field}` at `{path}` must be an array")]
    ChildrenNotArray { path: String, field: String },
    #[error("layout field names must not be empty")]
    EmptyFieldName,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
