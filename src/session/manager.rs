// Session manager: the offer/answer handshake rules on top of a storage backend

use super::error::{HandshakeError, StoreError};
use super::storage::SessionStorage;
use super::token::redact;
use super::types::{
    AnswerResponse, CreateSessionResponse, OfferResponse, Session, SessionConfig,
    SubmitAnswerRequest, SubmitOfferRequest,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Session manager for the signaling handshake
///
/// A session moves `Pending -> Active` when the sender's offer lands and
/// `Active -> Completed` when the viewer's answer lands. Expiry overrides every
/// state and is checked on each call.
pub struct SessionManager {
    storage: Arc<dyn SessionStorage>,
    config: SessionConfig,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(storage: Arc<dyn SessionStorage>, config: SessionConfig) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Handle to the backing store, for the background sweep
    pub fn storage(&self) -> Arc<dyn SessionStorage> {
        Arc::clone(&self.storage)
    }

    /// Start a new handshake and hand its token to the sender
    pub async fn create_session(&self) -> Result<CreateSessionResponse, HandshakeError> {
        let session = self
            .storage
            .create_session(self.config.token_expiry)
            .await?;

        info!("Sender session started with token {}", redact(&session.token));

        Ok(CreateSessionResponse {
            token: session.token,
        })
    }

    /// Store the sender's offer
    pub async fn submit_offer(&self, request: SubmitOfferRequest) -> Result<(), HandshakeError> {
        let offer = match request.offer {
            Some(offer) if offer.is_valid() => offer,
            _ => return Err(HandshakeError::InvalidOffer),
        };

        let mut session = self.load_live(&request.token).await?;
        let read_as = session.stored_status();
        let kind = offer.kind.clone();
        session.accept_offer(offer)?;

        self.storage
            .update_session(session, read_as)
            .await
            .map_err(|e| match e {
                StoreError::WriteOnce { .. } | StoreError::StatusChanged { .. } => {
                    HandshakeError::OfferAlreadySubmitted
                }
                other => other.into(),
            })?;

        info!(
            "Offer stored for token {} (type: {})",
            redact(&request.token),
            kind
        );
        Ok(())
    }

    /// Return the stored offer to the polling viewer
    pub async fn get_offer(&self, token: &str) -> Result<OfferResponse, HandshakeError> {
        let session = self.load_live(token).await?;

        match session.offer() {
            Some(offer) => {
                debug!("Offer retrieved for token {}", redact(token));
                Ok(OfferResponse {
                    offer: offer.clone(),
                })
            }
            None => Err(HandshakeError::OfferNotFound),
        }
    }

    /// Store the viewer's answer, completing the handshake
    pub async fn submit_answer(&self, request: SubmitAnswerRequest) -> Result<(), HandshakeError> {
        let answer = match request.answer {
            Some(answer) if answer.is_valid() => answer,
            _ => return Err(HandshakeError::InvalidAnswer),
        };

        let mut session = self.load_live(&request.token).await?;
        let read_as = session.stored_status();
        let kind = answer.kind.clone();

        if let Err(e) = session.accept_answer(answer) {
            if e == HandshakeError::AnswerAlreadyExists {
                warn!("Answer already exists for token {}", redact(&request.token));
            }
            return Err(e);
        }

        self.storage
            .update_session(session, read_as)
            .await
            .map_err(|e| match e {
                StoreError::WriteOnce { .. } | StoreError::StatusChanged { .. } => {
                    HandshakeError::AnswerAlreadyExists
                }
                other => other.into(),
            })?;

        info!(
            "Answer stored for token {} (type: {}), handshake complete",
            redact(&request.token),
            kind
        );
        Ok(())
    }

    /// Return the stored answer to the polling sender
    pub async fn get_answer(&self, token: &str) -> Result<AnswerResponse, HandshakeError> {
        let session = self.load_live(token).await?;

        match session.answer() {
            Some(answer) => {
                debug!("Answer retrieved for token {}", redact(token));
                Ok(AnswerResponse {
                    answer: answer.clone(),
                })
            }
            None => Err(HandshakeError::AnswerNotFound),
        }
    }

    /// Drop a session before its TTL runs out
    pub async fn delete_session(&self, token: &str) {
        self.storage.delete_session(token).await;
    }

    /// Cleanup expired sessions (the background sweep calls this periodically)
    pub async fn cleanup_expired_sessions(&self) -> usize {
        self.storage.cleanup_expired_sessions().await
    }

    /// Number of sessions with a live handshake. Advisory only.
    pub async fn active_session_count(&self) -> usize {
        self.storage.active_session_count().await
    }

    /// Fetch a snapshot, treating an expired-but-unswept entry as expired
    async fn load_live(&self, token: &str) -> Result<Session, HandshakeError> {
        let session = self.storage.get_session(token).await?;

        if session.is_expired() {
            return Err(HandshakeError::SessionExpired);
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemorySessionStorage;
    use crate::session::types::{SessionDescription, SessionStatus};
    use std::time::Duration;

    fn manager() -> SessionManager {
        SessionManager::new(
            Arc::new(MemorySessionStorage::new()),
            SessionConfig::default(),
        )
    }

    fn short_lived_manager() -> SessionManager {
        let config = SessionConfig {
            token_expiry: Duration::from_millis(50),
            ..Default::default()
        };
        SessionManager::new(Arc::new(MemorySessionStorage::new()), config)
    }

    fn offer_request(token: &str) -> SubmitOfferRequest {
        SubmitOfferRequest {
            token: token.to_string(),
            offer: Some(SessionDescription::new("offer", "v=0\r\no=- 1 1 IN IP4 0.0.0.0\r\n")),
        }
    }

    fn answer_request(token: &str) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            token: token.to_string(),
            answer: Some(SessionDescription::new("answer", "v=0\r\no=- 2 2 IN IP4 0.0.0.0\r\n")),
        }
    }

    #[tokio::test]
    async fn test_create_session() {
        let manager = manager();
        let response = manager.create_session().await.unwrap();

        let session = manager.storage().get_session(&response.token).await.unwrap();
        assert_eq!(session.status(), SessionStatus::Pending);
        assert_eq!(manager.active_session_count().await, 0);
    }

    #[tokio::test]
    async fn test_offer_round_trip() {
        let manager = manager();
        let token = manager.create_session().await.unwrap().token;

        let request = offer_request(&token);
        let submitted = request.offer.clone().unwrap();
        manager.submit_offer(request).await.unwrap();

        let response = manager.get_offer(&token).await.unwrap();
        assert_eq!(response.offer, submitted);

        // Polling again returns the same payload.
        let again = manager.get_offer(&token).await.unwrap();
        assert_eq!(again.offer, submitted);
    }

    #[tokio::test]
    async fn test_offer_validation() {
        let manager = manager();
        let token = manager.create_session().await.unwrap().token;

        let missing = SubmitOfferRequest {
            token: token.clone(),
            offer: None,
        };
        assert_eq!(
            manager.submit_offer(missing).await,
            Err(HandshakeError::InvalidOffer)
        );

        let empty_sdp = SubmitOfferRequest {
            token: token.clone(),
            offer: Some(SessionDescription::new("offer", "")),
        };
        assert_eq!(
            manager.submit_offer(empty_sdp).await,
            Err(HandshakeError::InvalidOffer)
        );

        let empty_type = SubmitOfferRequest {
            token: token.clone(),
            offer: Some(SessionDescription::new("", "v=0")),
        };
        assert_eq!(
            manager.submit_offer(empty_type).await,
            Err(HandshakeError::InvalidOffer)
        );

        assert_eq!(
            manager.get_offer(&token).await.unwrap_err(),
            HandshakeError::OfferNotFound
        );
    }

    #[tokio::test]
    async fn test_second_offer_rejected() {
        let manager = manager();
        let token = manager.create_session().await.unwrap().token;

        manager.submit_offer(offer_request(&token)).await.unwrap();

        let replacement = SubmitOfferRequest {
            token: token.clone(),
            offer: Some(SessionDescription::new("offer", "v=0 replaced")),
        };
        assert_eq!(
            manager.submit_offer(replacement).await,
            Err(HandshakeError::OfferAlreadySubmitted)
        );

        let stored = manager.get_offer(&token).await.unwrap();
        assert_eq!(stored.offer, offer_request(&token).offer.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let manager = manager();

        assert_eq!(
            manager.submit_offer(offer_request("missing")).await,
            Err(HandshakeError::SessionNotFound)
        );
        assert_eq!(
            manager.get_offer("missing").await.unwrap_err(),
            HandshakeError::SessionNotFound
        );
        assert_eq!(
            manager.submit_answer(answer_request("missing")).await,
            Err(HandshakeError::SessionNotFound)
        );
        assert_eq!(
            manager.get_answer("missing").await.unwrap_err(),
            HandshakeError::SessionNotFound
        );
    }

    #[tokio::test]
    async fn test_answer_before_offer() {
        let manager = manager();
        let token = manager.create_session().await.unwrap().token;

        assert_eq!(
            manager.submit_answer(answer_request(&token)).await,
            Err(HandshakeError::SessionNotReady)
        );
        assert_eq!(
            manager.get_answer(&token).await.unwrap_err(),
            HandshakeError::AnswerNotFound
        );
    }

    #[tokio::test]
    async fn test_second_answer_rejected() {
        let manager = manager();
        let token = manager.create_session().await.unwrap().token;

        manager.submit_offer(offer_request(&token)).await.unwrap();
        manager.submit_answer(answer_request(&token)).await.unwrap();

        let replacement = SubmitAnswerRequest {
            token: token.clone(),
            answer: Some(SessionDescription::new("answer", "v=0 replaced")),
        };
        assert_eq!(
            manager.submit_answer(replacement).await,
            Err(HandshakeError::AnswerAlreadyExists)
        );

        let stored = manager.get_answer(&token).await.unwrap();
        assert_eq!(stored.answer, answer_request(&token).answer.unwrap());
    }

    #[tokio::test]
    async fn test_answer_validation() {
        let manager = manager();
        let token = manager.create_session().await.unwrap().token;
        manager.submit_offer(offer_request(&token)).await.unwrap();

        let invalid = SubmitAnswerRequest {
            token: token.clone(),
            answer: Some(SessionDescription::new("answer", "")),
        };
        assert_eq!(
            manager.submit_answer(invalid).await,
            Err(HandshakeError::InvalidAnswer)
        );
    }

    #[tokio::test]
    async fn test_expired_session_rejects_everything() {
        let manager = short_lived_manager();
        let pending = manager.create_session().await.unwrap().token;
        let offered = manager.create_session().await.unwrap().token;
        manager.submit_offer(offer_request(&offered)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Not swept yet, but already unreachable.
        assert_eq!(
            manager.submit_offer(offer_request(&pending)).await,
            Err(HandshakeError::SessionExpired)
        );
        assert_eq!(
            manager.get_offer(&offered).await.unwrap_err(),
            HandshakeError::SessionExpired
        );
        assert_eq!(
            manager.submit_answer(answer_request(&offered)).await,
            Err(HandshakeError::SessionExpired)
        );
        assert_eq!(
            manager.get_answer(&offered).await.unwrap_err(),
            HandshakeError::SessionExpired
        );
        assert_eq!(manager.active_session_count().await, 0);

        assert_eq!(manager.cleanup_expired_sessions().await, 2);
        assert_eq!(
            manager.get_offer(&offered).await.unwrap_err(),
            HandshakeError::SessionNotFound
        );
    }

    #[tokio::test]
    async fn test_deleted_session() {
        let manager = manager();
        let token = manager.create_session().await.unwrap().token;
        manager.submit_offer(offer_request(&token)).await.unwrap();

        manager.delete_session(&token).await;

        assert_eq!(
            manager.get_offer(&token).await.unwrap_err(),
            HandshakeError::SessionNotFound
        );
    }

    #[tokio::test]
    async fn test_full_handshake_counts_as_active() {
        let manager = manager();
        let token = manager.create_session().await.unwrap().token;

        manager.submit_offer(offer_request(&token)).await.unwrap();
        assert_eq!(manager.active_session_count().await, 1);

        manager.submit_answer(answer_request(&token)).await.unwrap();
        assert_eq!(manager.active_session_count().await, 1);

        let session = manager.storage().get_session(&token).await.unwrap();
        assert_eq!(session.status(), SessionStatus::Completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_offers_store_exactly_one() {
        let manager = Arc::new(manager());
        let token = manager.create_session().await.unwrap().token;

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let manager = Arc::clone(&manager);
                let token = token.clone();
                tokio::spawn(async move {
                    let request = SubmitOfferRequest {
                        token,
                        offer: Some(SessionDescription::new("offer", format!("v=0 #{i}"))),
                    };
                    manager.submit_offer(request).await
                })
            })
            .collect();

        let mut accepted = Vec::new();
        for (i, handle) in handles.into_iter().enumerate() {
            match handle.await.unwrap() {
                Ok(()) => accepted.push(i),
                Err(e) => assert_eq!(e, HandshakeError::OfferAlreadySubmitted),
            }
        }

        assert_eq!(accepted.len(), 1);
        let stored = manager.get_offer(&token).await.unwrap();
        assert_eq!(stored.offer.sdp, format!("v=0 #{}", accepted[0]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_identical_submissions_store_exactly_one() {
        for _ in 0..50 {
            let manager = Arc::new(manager());
            let token = manager.create_session().await.unwrap().token;

            let offers: Vec<_> = (0..8)
                .map(|_| {
                    let manager = Arc::clone(&manager);
                    let request = offer_request(&token);
                    tokio::spawn(async move { manager.submit_offer(request).await })
                })
                .collect();
            let mut accepted = 0;
            for handle in offers {
                match handle.await.unwrap() {
                    Ok(()) => accepted += 1,
                    Err(e) => assert_eq!(e, HandshakeError::OfferAlreadySubmitted),
                }
            }
            assert_eq!(accepted, 1);

            let answers: Vec<_> = (0..8)
                .map(|_| {
                    let manager = Arc::clone(&manager);
                    let request = answer_request(&token);
                    tokio::spawn(async move { manager.submit_answer(request).await })
                })
                .collect();
            let mut accepted = 0;
            for handle in answers {
                match handle.await.unwrap() {
                    Ok(()) => accepted += 1,
                    Err(e) => assert_eq!(e, HandshakeError::AnswerAlreadyExists),
                }
            }
            assert_eq!(accepted, 1);
        }
    }
}
