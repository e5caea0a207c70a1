// Session types and data structures

use super::error::HandshakeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of random bytes behind a session token (72 bits, 12 base64url chars).
pub const DEFAULT_TOKEN_BYTES: usize = 9;

/// Smallest token length the store accepts.
pub const MIN_TOKEN_BYTES: usize = DEFAULT_TOKEN_BYTES;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a session stays reachable after creation
    pub token_expiry: Duration,
    /// How often the background sweep removes expired sessions
    pub sweep_interval: Duration,
    /// Random bytes per generated token
    pub token_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_expiry: Duration::from_secs(30 * 60), // 30 minutes
            sweep_interval: Duration::from_secs(60),    // once per minute
            token_bytes: DEFAULT_TOKEN_BYTES,
        }
    }
}

/// Session status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, waiting for the sender's offer
    Pending,
    /// Offer stored, waiting for the viewer's answer
    Active,
    /// Offer and answer both stored
    Completed,
    /// Past its expiry time. Never stored, only reported.
    Expired,
}

/// An SDP offer or answer exactly as the browser produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: String,
    pub sdp: String,
}

impl SessionDescription {
    pub fn new(kind: impl Into<String>, sdp: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            sdp: sdp.into(),
        }
    }

    /// Both fields must be present. The SDP body itself is opaque.
    pub fn is_valid(&self) -> bool {
        !self.kind.is_empty() && !self.sdp.is_empty()
    }
}

/// One screen-share handshake between a sender and a viewer.
///
/// `status` decides which transition is legal; `offer` and `answer` are only
/// written through [`Session::accept_offer`] and [`Session::accept_answer`], so
/// they can never disagree with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    /// Unguessable token, the only credential for this session
    pub token: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session stops being reachable (fixed at creation)
    pub expires_at: DateTime<Utc>,
    status: SessionStatus,
    offer: Option<SessionDescription>,
    answer: Option<SessionDescription>,
}

impl Session {
    /// Create a new pending session that lives for `ttl`
    pub fn new(token: String, ttl: Duration) -> Self {
        let now = Utc::now();
        // Absurd TTLs saturate instead of overflowing the calendar.
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            token,
            created_at: now,
            expires_at,
            status: SessionStatus::Pending,
            offer: None,
            answer: None,
        }
    }

    pub fn offer(&self) -> Option<&SessionDescription> {
        self.offer.as_ref()
    }

    pub fn answer(&self) -> Option<&SessionDescription> {
        self.answer.as_ref()
    }

    /// Stored status, without the expiry overlay
    pub fn stored_status(&self) -> SessionStatus {
        self.status
    }

    /// Status as callers observe it: `Expired` once the TTL has passed
    pub fn status(&self) -> SessionStatus {
        self.status_at(Utc::now())
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> SessionStatus {
        if self.is_expired_at(now) {
            SessionStatus::Expired
        } else {
            self.status
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// A live handshake: the offer is in and the session has not expired.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status_at(now),
            SessionStatus::Active | SessionStatus::Completed
        )
    }

    /// Store the sender's offer. Only legal while `Pending`.
    pub fn accept_offer(&mut self, offer: SessionDescription) -> Result<(), HandshakeError> {
        match self.status {
            SessionStatus::Pending => {
                self.offer = Some(offer);
                self.status = SessionStatus::Active;
                Ok(())
            }
            SessionStatus::Expired => Err(HandshakeError::SessionExpired),
            SessionStatus::Active | SessionStatus::Completed => {
                Err(HandshakeError::OfferAlreadySubmitted)
            }
        }
    }

    /// Store the viewer's answer. Only legal while `Active`.
    pub fn accept_answer(&mut self, answer: SessionDescription) -> Result<(), HandshakeError> {
        match self.status {
            SessionStatus::Active => {
                self.answer = Some(answer);
                self.status = SessionStatus::Completed;
                Ok(())
            }
            SessionStatus::Pending => Err(HandshakeError::SessionNotReady),
            SessionStatus::Completed => Err(HandshakeError::AnswerAlreadyExists),
            SessionStatus::Expired => Err(HandshakeError::SessionExpired),
        }
    }
}

/// Response for `POST /api/new`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub token: String,
}

/// Body of `POST /api/offer`. Older clients send the payload under `sdp`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitOfferRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default, alias = "sdp")]
    pub offer: Option<SessionDescription>,
}

/// Body of `POST /api/answer`. Older clients send the payload under `sdp`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswerRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default, alias = "sdp")]
    pub answer: Option<SessionDescription>,
}

/// `?token=` query for the polling endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferResponse {
    pub offer: SessionDescription,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: SessionDescription,
}
