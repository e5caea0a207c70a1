// Signaling session management
// Token-keyed offer/answer store, handshake rules and background expiry

pub mod error;
pub mod manager;
pub mod storage;
pub mod sweeper;
pub mod token;
pub mod types;

pub use error::{ErrorKind, HandshakeError, StoreError};
pub use manager::SessionManager;
pub use storage::{MemorySessionStorage, SessionStorage};
pub use sweeper::{SessionSweeper, SweeperHandle};
pub use types::{
    AnswerResponse, CreateSessionResponse, OfferResponse, Session, SessionConfig,
    SessionDescription, SessionStatus, SubmitAnswerRequest, SubmitOfferRequest, TokenQuery,
};
