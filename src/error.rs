use thiserror::Error;

/// Errors internal to the user store. None of these cross the store's
/// public surface; operations catch them, log, and degrade to a benign
/// return value.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not connected to the database")]
    NotConnected,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// True when the underlying error is a unique-constraint violation
    /// (SQLSTATE 23505), e.g. inserting a duplicate email.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Database(db)) => {
                db.code().as_deref() == Some("23505")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_connected_is_not_a_unique_violation() {
        assert!(!StoreError::NotConnected.is_unique_violation());
    }

    #[test]
    fn row_not_found_is_not_a_unique_violation() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(!err.is_unique_violation());
    }
}
