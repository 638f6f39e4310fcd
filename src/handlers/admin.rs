// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::{error::AppError, models::user::User, utils::jwt::Claims};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password, role, created_at FROM users ORDER BY id DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id() {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Deletes any quiz regardless of owner.
/// Admin only.
pub async fn delete_any_quiz(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    tracing::info!("Admin deleted quiz {}", quiz_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Platform counters for the admin dashboard.
#[derive(Debug, Serialize, FromRow)]
pub struct DashboardStats {
    pub total_students: i64,
    pub total_professors: i64,
    pub total_quizzes: i64,
    pub active_quizzes: i64,
    pub total_participations: i64,
    pub pending_reclamations: i64,
}

/// Returns platform-wide counters.
/// Admin only.
pub async fn get_dashboard_stats(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let stats = sqlx::query_as::<_, DashboardStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users WHERE role = 'student') AS total_students,
            (SELECT COUNT(*) FROM users WHERE role = 'professor') AS total_professors,
            (SELECT COUNT(*) FROM quizzes) AS total_quizzes,
            (SELECT COUNT(*) FROM quizzes WHERE status = 'active') AS active_quizzes,
            (SELECT COUNT(*) FROM participations) AS total_participations,
            (SELECT COUNT(*) FROM reclamations WHERE status = 'pending') AS pending_reclamations
        "#,
    )
    .fetch_one(&pool)
    .await?;

    Ok(Json(stats))
}
