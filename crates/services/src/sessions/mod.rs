mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::{QuizSession, SessionAction, SessionEffect, SessionStatus, Transition};
pub use workflow::{ActiveQuiz, QuizOutcome, QuizSessionHost, QuizUpdate};
