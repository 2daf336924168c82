#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("{0}")]
	InvalidArgument(String),
	#[error("{0}")]
	NotFound(String),
}
