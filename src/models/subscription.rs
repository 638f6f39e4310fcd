// src/models/subscription.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'subscriptions' table: flat plan templates shown on the
/// pricing page (name/price/duration), distinct from purchased instances.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlanTemplate {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub duration_days: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'professor_subscriptions' table: a time-bounded plan
/// instance purchased by a professor. A professor accumulates rows over
/// time; "current" is always derived, never stored.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProfessorSubscription {
    pub id: i64,
    pub professor_id: i64,
    pub plan_type: String,
    pub price: f64,
    /// Start of the first day of the plan window (00:00:00).
    pub start_date: chrono::DateTime<chrono::Utc>,
    /// End of the last day of the plan window (23:59:59, inclusive).
    pub end_date: chrono::DateTime<chrono::Utc>,
    pub payment_method: String,
    pub is_active: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for purchasing a subscription. Dates use the 'yyyy-MM-dd' format.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubscriptionRequest {
    #[validate(length(min = 1, max = 100))]
    pub plan_type: String,
    #[validate(range(min = 0.0))]
    pub price: f64,
    pub start_date: String,
    pub end_date: String,
    #[validate(length(min = 1, max = 50))]
    pub payment_method: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// DTO for the admin active/inactive toggle.
#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionStatusRequest {
    pub is_active: bool,
}

/// Current-subscription payload with derived expiry info.
#[derive(Debug, Serialize)]
pub struct CurrentSubscriptionResponse {
    #[serde(flatten)]
    pub subscription: ProfessorSubscription,
    pub days_remaining: i64,
    pub expiring_soon: bool,
}
