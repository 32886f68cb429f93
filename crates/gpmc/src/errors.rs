use thiserror::Error;

/// A result type for SGPMC modeling
pub type Result<T> = std::result::Result<T, GpError>;

/// An error when building, evaluating or sampling a [`Sgpmc`](crate::Sgpmc) model
#[derive(Error, Debug)]
pub enum GpError {
    /// When linear algebra computation fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
    /// When arrays do not have the expected shapes
    #[error("Shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
    /// When a numeric type cannot be mapped to a canonical one
    #[error("Unknown dtype \"{0}\" passed to normalizer")]
    UnsupportedDType(String),
    /// When a value is invalid
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When saving fails
    #[cfg(feature = "persistent")]
    #[error("Save error: {0}")]
    SaveError(#[from] serde_json::Error),
    /// When error during loading
    #[error("Load IO error")]
    LoadIoError(#[from] std::io::Error),
    /// When error during loading
    #[error("Load error: {0}")]
    LoadError(String),
}
