mod ids;
mod question;
mod response;
mod result;
mod settings;

pub use ids::{AttemptId, ParseIdError, QuestionId, ResponseId};

pub use question::{Difficulty, Question, QuestionError, QuestionRecord, QuestionType};
pub use response::{CORRECT_FEEDBACK, QuestionResponse};
pub use result::{QuizResult, QuizResultError, QuizStatistics};
pub use settings::{SessionSettings, SettingsError, TimerScope};
