use thiserror::Error;

use crate::model::{QuestionError, QuizResultError, SettingsError};
use crate::recorder::ResponseSetError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    ResponseSet(#[from] ResponseSetError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Result(#[from] QuizResultError),
}
