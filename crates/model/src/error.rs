use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("incomplete entity: {message}")]
    Incomplete { message: String },
    #[error("no such entity: {message}")]
    NoSuchEntity { message: String },
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
    #[error("invalid id: {message}")]
    InvalidId { message: String },
    #[error("illegal state: {message}")]
    IllegalState { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl StoreError {
    pub fn incomplete(message: impl Into<String>) -> Self {
        Self::Incomplete {
            message: message.into(),
        }
    }

    pub fn no_such_entity(message: impl Into<String>) -> Self {
        Self::NoSuchEntity {
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sea_orm::DbErr> for StoreError {
    fn from(value: sea_orm::DbErr) -> Self {
        StoreError::storage(value.to_string())
    }
}
