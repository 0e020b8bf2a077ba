// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::error::AppError;

/// Represents the 'questions' table in the database.
/// Reference data: the application only ever reads it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: i64,

    /// Topic the question belongs to.
    pub subject_id: i64,

    /// Qualification catalog key, e.g. "INF.03".
    pub exam_code: String,

    /// Question text (markdown).
    pub content: String,

    /// Optional illustration path.
    pub image: Option<String>,

    /// Shown to the user after answering.
    pub explanation: Option<String>,
}

/// Represents the 'answers' table in the database.
/// Serialized only inside test payloads, where the client grades locally.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub content: String,
    pub is_correct: bool,
}

/// DTO for sending an answer to the client without the correctness flag.
/// Used by the single-question endpoint, where grading goes through
/// `/check-answer`.
#[derive(Debug, Serialize)]
pub struct PublicAnswer {
    pub id: i64,
    pub content: String,
}

impl From<Answer> for PublicAnswer {
    fn from(a: Answer) -> Self {
        PublicAnswer {
            id: a.id,
            content: a.content,
        }
    }
}

/// DTO for `/check-answer` (form-encoded).
#[derive(Debug, Deserialize)]
pub struct CheckAnswerForm {
    pub question_id: i64,
    pub answer_id: i64,
}

/// Question-selection policy, chosen by the client via `premium_option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Random,
    ToDiscover,
    ToImprove,
    ToRemind,
    LastMistakes,
}

impl SelectionMode {
    /// Absent or empty means random practice. Unknown values are a client
    /// error rather than a silent fallback.
    pub fn parse(value: Option<&str>) -> Result<Self, AppError> {
        match value {
            None | Some("") => Ok(SelectionMode::Random),
            Some("toDiscover") => Ok(SelectionMode::ToDiscover),
            Some("toImprove") => Ok(SelectionMode::ToImprove),
            Some("toRemind") => Ok(SelectionMode::ToRemind),
            Some("lastMistakes") => Ok(SelectionMode::LastMistakes),
            Some(other) => Err(AppError::BadRequest(format!(
                "Unknown practice mode '{}'.",
                other
            ))),
        }
    }

    /// Message returned alongside `no_questions_left`.
    pub fn exhausted_message(self) -> &'static str {
        match self {
            SelectionMode::Random => "No questions available for the selected topics.",
            SelectionMode::ToDiscover => {
                "You have already discovered every question in these topics."
            }
            SelectionMode::ToImprove => {
                "Your accuracy is high everywhere. No questions need improvement right now."
            }
            SelectionMode::ToRemind => "Nothing to review yet. Answer some questions first.",
            SelectionMode::LastMistakes => "No recent mistakes in these topics. Keep it up!",
        }
    }
}

/// Parsed query parameters of the question/test endpoints.
///
/// The client sends PHP-style repeated keys (`subject[]=1&subject[]=3`),
/// which a plain serde struct cannot capture, so the raw pair list is
/// walked by hand.
#[derive(Debug)]
pub struct QuizParams {
    pub subject_ids: Vec<i64>,
    pub mode: SelectionMode,
    pub question_count: Option<i64>,
}

impl QuizParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, AppError> {
        let mut subject_ids = Vec::new();
        let mut mode_raw: Option<&str> = None;
        let mut question_count = None;

        for (key, value) in pairs {
            match key.as_str() {
                "subject[]" | "subject" => {
                    let id = value
                        .parse::<i64>()
                        .map_err(|_| AppError::BadRequest("Invalid subject id.".to_string()))?;
                    subject_ids.push(id);
                }
                "premium_option" => mode_raw = Some(value.as_str()),
                "question_count" => {
                    let count = value.parse::<i64>().map_err(|_| {
                        AppError::BadRequest("Invalid question count.".to_string())
                    })?;
                    question_count = Some(count);
                }
                _ => {}
            }
        }

        Ok(QuizParams {
            subject_ids,
            mode: SelectionMode::parse(mode_raw)?,
            question_count,
        })
    }
}
