use std::env;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use quiz_core::model::{AttemptId, QuestionResponse, QuizResult};

use super::{QuizBackend, ResponseSubmission, SessionPayload, SessionPayloadRecord, SubmitReceipt};
use crate::error::BackendError;

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Clone, Debug)]
pub struct QuizApiConfig {
    pub base_url: Url,
    pub token: Option<String>,
}

impl QuizApiConfig {
    /// Build a config, validating the base URL.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidBaseUrl` if `base_url` does not parse or
    /// cannot carry a path.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, BackendError> {
        let raw = base_url.into();
        let base_url = match Url::parse(&raw) {
            Ok(url) if !url.cannot_be_a_base() => url,
            _ => return Err(BackendError::InvalidBaseUrl(raw)),
        };
        let token = token.filter(|t| !t.trim().is_empty());
        Ok(Self { base_url, token })
    }

    /// Read `QUIZ_API_BASE_URL` and `QUIZ_API_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidBaseUrl` if the configured URL does not parse.
    pub fn from_env() -> Result<Self, BackendError> {
        let base_url =
            env::var("QUIZ_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let token = env::var("QUIZ_API_TOKEN").ok();
        Self::new(base_url, token)
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// `QuizBackend` over the quiz REST API.
#[derive(Clone)]
pub struct HttpQuizBackend {
    client: Client,
    config: QuizApiConfig,
}

impl HttpQuizBackend {
    #[must_use]
    pub fn new(config: QuizApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// # Errors
    ///
    /// Returns `BackendError::InvalidBaseUrl` if the configured URL does not parse.
    pub fn from_env() -> Result<Self, BackendError> {
        Ok(Self::new(QuizApiConfig::from_env()?))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read<T: DeserializeOwned>(
        response: Response,
        attempt_id: &AttemptId,
    ) -> Result<T, BackendError> {
        match response.status() {
            StatusCode::NOT_FOUND => Err(BackendError::NotFound(attempt_id.clone())),
            status if !status.is_success() => Err(BackendError::HttpStatus(status)),
            _ => {
                let body: Envelope<T> = response.json().await?;
                Ok(body.data)
            }
        }
    }
}

#[async_trait]
impl QuizBackend for HttpQuizBackend {
    async fn fetch_session(&self, attempt_id: &AttemptId) -> Result<SessionPayload, BackendError> {
        let url = self
            .config
            .endpoint(&["quiz", "session", attempt_id.as_str()])?;
        let response = self.authorize(self.client.get(url)).send().await?;
        let record: SessionPayloadRecord = Self::read(response, attempt_id).await?;
        record.validate()
    }

    async fn submit_response(&self, submission: &ResponseSubmission) -> Result<(), BackendError> {
        let url = self.config.endpoint(&["quiz", "responses"])?;
        let response = self
            .authorize(self.client.post(url))
            .json(submission)
            .send()
            .await?;
        let ack: Ack = Self::read(response, &submission.attempt_id).await?;
        ack.into_result()
    }

    async fn submit_quiz(
        &self,
        attempt_id: &AttemptId,
        responses: &[QuestionResponse],
    ) -> Result<SubmitReceipt, BackendError> {
        let url = self.config.endpoint(&["quiz", "submit"])?;
        let payload = SubmitQuizRequest {
            attempt_id,
            responses,
        };
        let response = self
            .authorize(self.client.post(url))
            .json(&payload)
            .send()
            .await?;
        let ack: Ack = Self::read(response, attempt_id).await?;
        if ack.status != SubmitReceipt::COMPLETED {
            return Err(BackendError::Rejected(
                ack.message
                    .unwrap_or_else(|| format!("unexpected status {:?}", ack.status)),
            ));
        }
        Ok(SubmitReceipt {
            attempt_id: attempt_id.clone(),
            status: ack.status,
        })
    }

    async fn fetch_result(&self, attempt_id: &AttemptId) -> Result<QuizResult, BackendError> {
        let url = self
            .config
            .endpoint(&["quiz", "responses", attempt_id.as_str()])?;
        let response = self.authorize(self.client.get(url)).send().await?;
        Self::read(response, attempt_id).await
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Ack {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
}

impl Ack {
    fn into_result(self) -> Result<(), BackendError> {
        if self.status == "error" {
            return Err(BackendError::Rejected(
                self.message.unwrap_or_else(|| "response rejected".into()),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SubmitQuizRequest<'a> {
    attempt_id: &'a AttemptId,
    responses: &'a [QuestionResponse],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_rejects_invalid_base_url() {
        let err = QuizApiConfig::new("not a url", None).unwrap_err();
        assert!(matches!(err, BackendError::InvalidBaseUrl(_)));
    }

    #[test]
    fn config_drops_blank_token() {
        let config = QuizApiConfig::new("https://quiz.example.edu/api", Some("  ".into())).unwrap();
        assert!(config.token.is_none());
    }

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let config = QuizApiConfig::new("https://quiz.example.edu/api/", None).unwrap();
        assert_eq!(
            config.endpoint(&["quiz", "submit"]).unwrap().as_str(),
            "https://quiz.example.edu/api/quiz/submit"
        );
    }

    #[test]
    fn attempt_id_is_encoded_as_a_single_segment() {
        let config = QuizApiConfig::new("https://quiz.example.edu/api", None).unwrap();
        let url = config.endpoint(&["quiz", "session", "att/7?x"]).unwrap();
        assert_eq!(url.path(), "/api/quiz/session/att%2F7%3Fx");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn config_rejects_base_without_path() {
        let err = QuizApiConfig::new("mailto:quiz@example.edu", None).unwrap_err();
        assert!(matches!(err, BackendError::InvalidBaseUrl(_)));
    }

    #[test]
    fn session_envelope_parses_and_validates() {
        let body = r#"{
            "data": {
                "attempt_id": "att-7",
                "time_limit_seconds": 600,
                "questions": [
                    {"question_id": "q1", "text": "Pick A", "options": ["A", "B"],
                     "correct_answer": "A", "points": 10, "time_estimate": 30}
                ]
            }
        }"#;
        let envelope: Envelope<SessionPayloadRecord> = serde_json::from_str(body).unwrap();
        let payload = envelope.data.validate().unwrap();

        assert_eq!(payload.attempt_id, AttemptId::new("att-7"));
        assert_eq!(payload.time_limit_secs, 600);
        assert_eq!(payload.questions[0].time_allotment_secs(), Some(30));
    }

    #[test]
    fn error_ack_becomes_rejection() {
        let ack: Ack = serde_json::from_str(r#"{"status":"error","message":"closed"}"#).unwrap();
        let err = ack.into_result().unwrap_err();
        assert!(matches!(err, BackendError::Rejected(msg) if msg == "closed"));
    }
}
