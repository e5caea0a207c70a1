// Session store and handshake errors

use super::types::SessionStatus;
use thiserror::Error;

/// Failures reported by a [`SessionStorage`](super::SessionStorage) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("session not found")]
    SessionNotFound,

    #[error("session expired")]
    SessionExpired,

    /// A write tried to replace an offer or answer that is already stored.
    #[error("{field} is already set and cannot be replaced")]
    WriteOnce { field: &'static str },

    /// The stored session moved on since the caller read its snapshot.
    #[error("session status is {found:?}, expected {expected:?}")]
    StatusChanged {
        expected: SessionStatus,
        found: SessionStatus,
    },

    /// A freshly generated token matched a live session.
    #[error("token collision with a live session")]
    TokenCollision,

    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),
}

/// Outcome of a rejected handshake step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("session not found")]
    SessionNotFound,

    #[error("session expired")]
    SessionExpired,

    #[error("invalid offer")]
    InvalidOffer,

    #[error("invalid answer")]
    InvalidAnswer,

    #[error("session cannot accept offer")]
    OfferAlreadySubmitted,

    #[error("offer not found")]
    OfferNotFound,

    #[error("answer not found")]
    AnswerNotFound,

    #[error("answer already exists")]
    AnswerAlreadyExists,

    #[error("session not ready for answer")]
    SessionNotReady,

    #[error("session store failure: {0}")]
    Internal(StoreError),
}

/// Error taxonomy shared by every handshake failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown token, or the requested payload is not there yet
    NotFound,
    /// Token known but past its TTL
    Expired,
    /// Payload missing required fields
    Malformed,
    /// Step attempted out of order or twice
    OrderingViolation,
    /// Aborts the request but not the store
    Internal,
}

impl HandshakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HandshakeError::SessionNotFound
            | HandshakeError::OfferNotFound
            | HandshakeError::AnswerNotFound => ErrorKind::NotFound,
            HandshakeError::SessionExpired => ErrorKind::Expired,
            HandshakeError::InvalidOffer | HandshakeError::InvalidAnswer => ErrorKind::Malformed,
            HandshakeError::OfferAlreadySubmitted
            | HandshakeError::SessionNotReady
            | HandshakeError::AnswerAlreadyExists => ErrorKind::OrderingViolation,
            HandshakeError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for HandshakeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotFound => HandshakeError::SessionNotFound,
            StoreError::SessionExpired => HandshakeError::SessionExpired,
            other => HandshakeError::Internal(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_convert() {
        assert_eq!(
            HandshakeError::from(StoreError::SessionNotFound),
            HandshakeError::SessionNotFound
        );
        assert_eq!(
            HandshakeError::from(StoreError::SessionExpired),
            HandshakeError::SessionExpired
        );
        assert_eq!(
            HandshakeError::from(StoreError::TokenCollision).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(HandshakeError::OfferNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(HandshakeError::SessionExpired.kind(), ErrorKind::Expired);
        assert_eq!(HandshakeError::InvalidAnswer.kind(), ErrorKind::Malformed);
        assert_eq!(
            HandshakeError::AnswerAlreadyExists.kind(),
            ErrorKind::OrderingViolation
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            StoreError::WriteOnce { field: "offer" }.to_string(),
            "offer is already set and cannot be replaced"
        );
        assert_eq!(
            StoreError::StatusChanged {
                expected: SessionStatus::Pending,
                found: SessionStatus::Active,
            }
            .to_string(),
            "session status is Active, expected Pending"
        );
        assert_eq!(
            HandshakeError::SessionNotReady.to_string(),
            "session not ready for answer"
        );
    }
}
