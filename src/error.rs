#[derive(Debug, thiserror::Error)]
pub enum SrsError {
    #[error("vocabulary entry not found: {0}")]
    NotFound(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}
