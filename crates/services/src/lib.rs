#![forbid(unsafe_code)]

pub mod backend;
pub mod error;
pub mod sessions;
pub mod timer;

pub use quiz_core::Clock;
pub use sessions as session;

pub use backend::{
    HttpQuizBackend, InMemoryBackend, QuizApiConfig, QuizBackend, ResponseSubmission,
    SessionPayload, SubmitReceipt,
};
pub use error::{BackendError, HostError, SessionError};
pub use sessions::{
    ActiveQuiz, QuizOutcome, QuizSession, QuizSessionHost, QuizUpdate, SessionAction,
    SessionEffect, SessionProgress, SessionStatus, Transition,
};
pub use timer::Ticker;
