pub mod order_repository;
pub mod user_repository;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),
}
