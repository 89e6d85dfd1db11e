use thiserror::Error;

#[derive(Error, Debug)]
pub enum TomoError {
    #[error("No surveys selected for inversion")]
    EmptySelection,

    #[error("All {total} observations removed by validity filtering")]
    NoValidObservations { total: usize },

    #[error(
        "Degenerate acquisition geometry: {nonzero_rows} non-zero sensitivity rows, need {required}"
    )]
    DegenerateGeometry {
        nonzero_rows: usize,
        required: usize,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type TomoResult<T> = Result<T, TomoError>;
