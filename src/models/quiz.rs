// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Quiz lifecycle status. Stored as lowercase TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    Draft,
    Active,
    Closed,
}

impl QuizStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizStatus::Draft => "draft",
            QuizStatus::Active => "active",
            QuizStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(QuizStatus::Draft),
            "active" => Some(QuizStatus::Active),
            "closed" => Some(QuizStatus::Closed),
            _ => None,
        }
    }
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub professor_id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Short join code participants enter to find the quiz.
    pub code: String,
    /// Advisory duration in minutes; not enforced server-side.
    pub duration_minutes: Option<i64>,
    /// 'draft', 'active' or 'closed'.
    pub status: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Quiz {
    pub fn is_joinable(&self) -> bool {
        self.status == QuizStatus::Active.as_str()
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,
}

/// Represents the 'responses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ResponseRow {
    pub id: i64,
    pub question_id: i64,
    pub response_text: String,
    pub is_correct: bool,
}

/// Participant-facing response option (correctness hidden).
#[derive(Debug, Serialize)]
pub struct PublicResponse {
    pub id: i64,
    pub question_id: i64,
    pub response_text: String,
}

impl From<ResponseRow> for PublicResponse {
    fn from(r: ResponseRow) -> Self {
        PublicResponse {
            id: r.id,
            question_id: r.question_id,
            response_text: r.response_text,
        }
    }
}

/// A question bundled with its response options, for the quiz-taking view.
#[derive(Debug, Serialize)]
pub struct QuestionWithResponses {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,
    pub responses: Vec<PublicResponse>,
}

/// Full quiz payload returned by get-with-questions.
#[derive(Debug, Serialize)]
pub struct QuizWithQuestions {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithResponses>,
}

/// DTO for creating a quiz. The join code and status are server-assigned.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required."))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i64>,
}

/// DTO for updating a quiz. Only supplied fields are applied.
#[derive(Debug, Deserialize)]
pub struct UpdateQuizRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i64>,
    pub status: Option<String>,
}

/// DTO for adding a question to a quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000, message = "Question text is required."))]
    pub question_text: String,
}

/// DTO for updating a question. Empty text leaves the question unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateQuestionRequest {
    pub question_text: Option<String>,
}

/// DTO for adding a response option to a question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateResponseRequest {
    #[validate(length(min = 1, max = 500, message = "Response text is required."))]
    pub response_text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for updating a response option.
#[derive(Debug, Deserialize)]
pub struct UpdateResponseRequest {
    pub response_text: Option<String>,
    pub is_correct: Option<bool>,
}
