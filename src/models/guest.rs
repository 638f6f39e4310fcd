// src/models/guest.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'guests' table. Guests join quizzes without an account.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Guest {
    pub id: i64,
    pub pseudo: String,
    pub email: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a guest before joining a quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGuestRequest {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Pseudo length must be between 1 and 50 characters."
    ))]
    pub pseudo: String,
    #[validate(email(message = "A valid email address is required."))]
    pub email: Option<String>,
}
