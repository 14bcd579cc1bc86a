use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Database(String),

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("malformed value in {table}: unexpected length {len}")]
    MalformedValue { table: &'static str, len: usize },

    #[error("malformed key in {table}: unexpected length {len}")]
    MalformedKey { table: &'static str, len: usize },
}

macro_rules! impl_database_error_from {
    ($($error_type:ty),*) => {
        $(
            impl From<$error_type> for DbError {
                fn from(err: $error_type) -> Self {
                    Self::Database(err.to_string())
                }
            }
        )*
    };
}

impl_database_error_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError
);
