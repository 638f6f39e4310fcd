// src/models/reclamation.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'reclamations' table: complaint tickets handled by admins.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reclamation {
    pub id: i64,
    pub user_id: i64,
    pub subject: String,
    pub message: String,
    /// 'pending', 'in_progress' or 'resolved'.
    pub status: String,
    pub response_text: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub const RECLAMATION_STATUSES: [&str; 3] = ["pending", "in_progress", "resolved"];

/// DTO for opening a complaint ticket.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReclamationRequest {
    #[validate(length(min = 1, max = 200, message = "Subject is required."))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000, message = "Message is required."))]
    pub message: String,
}

/// DTO for the admin status update.
#[derive(Debug, Deserialize)]
pub struct UpdateReclamationStatusRequest {
    pub status: String,
}

/// DTO for the admin response; sending one resolves the ticket.
#[derive(Debug, Deserialize, Validate)]
pub struct ReclamationResponseRequest {
    #[validate(length(min = 1, max = 5000, message = "Response text is required."))]
    pub response_text: String,
}
