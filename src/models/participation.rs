// src/models/participation.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

/// Who is taking the quiz: a registered user or an anonymous guest.
/// Structurally enforces that exactly one reference is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant {
    User(i64),
    Guest(i64),
}

impl Participant {
    /// Resolves the participant from an optional authenticated user id and
    /// an optional guest id supplied in the request body.
    pub fn resolve(user_id: Option<i64>, guest_id: Option<i64>) -> Result<Self, AppError> {
        match (user_id, guest_id) {
            (Some(u), None) => Ok(Participant::User(u)),
            (None, Some(g)) => Ok(Participant::Guest(g)),
            (Some(_), Some(_)) => Err(AppError::BadRequest(
                "A participation belongs to either a user or a guest, not both".to_string(),
            )),
            (None, None) => Err(AppError::BadRequest(
                "Either an authenticated user or a guest_id is required".to_string(),
            )),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Participant::User(id) => Some(*id),
            Participant::Guest(_) => None,
        }
    }

    pub fn guest_id(&self) -> Option<i64> {
        match self {
            Participant::User(_) => None,
            Participant::Guest(id) => Some(*id),
        }
    }
}

/// Represents the 'participations' table: one participant's single attempt
/// at one quiz.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Participation {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: Option<i64>,
    pub guest_id: Option<i64>,
    /// Percentage score, 0-100 with two decimals. Zero until submission.
    pub score: f64,
    /// Professor-set marker freezing further submission.
    pub is_fraud: bool,
    /// Raw per-question answers snapshot kept for audit/history display.
    pub student_responses: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Participation row joined with participant identity, for the professor's
/// report view.
#[derive(Debug, Serialize, FromRow)]
pub struct ParticipationWithIdentity {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: Option<i64>,
    pub guest_id: Option<i64>,
    pub score: f64,
    pub is_fraud: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Username for user participations, guest pseudo otherwise.
    pub participant_name: Option<String>,
}

/// DTO for access-on-view and join-by-code. Authenticated students are
/// identified by their token; guests pass their id here.
#[derive(Debug, Deserialize, Default)]
pub struct AccessQuizRequest {
    pub guest_id: Option<i64>,
}

/// DTO for submitting answers.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    /// Flat list of selected response ids across all questions.
    pub selected_response_ids: Vec<i64>,
    /// Free-text snapshot of the raw answers, stored verbatim.
    pub student_responses: Option<String>,
    pub guest_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_requires_exactly_one_reference() {
        assert_eq!(
            Participant::resolve(Some(3), None).unwrap(),
            Participant::User(3)
        );
        assert_eq!(
            Participant::resolve(None, Some(7)).unwrap(),
            Participant::Guest(7)
        );
        assert!(Participant::resolve(Some(3), Some(7)).is_err());
        assert!(Participant::resolve(None, None).is_err());
    }
}
