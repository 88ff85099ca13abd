use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Empty image reference")]
    Empty,

    #[error("Malformed image reference (empty path segment): {0}")]
    EmptySegment(String),

    #[error(
        "Unsupported image reference shape: {reference} has {segments} path segments, expected 1 to 4"
    )]
    UnsupportedShape { reference: String, segments: usize },
}
