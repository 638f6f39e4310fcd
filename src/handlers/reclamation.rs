// src/handlers/reclamation.rs
//
// Complaint tickets: any authenticated user can open one, admins triage
// them. Responding to a ticket resolves it in the same update.

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::reclamation::{
        CreateReclamationRequest, RECLAMATION_STATUSES, Reclamation, ReclamationResponseRequest,
        UpdateReclamationStatusRequest,
    },
    utils::jwt::Claims,
};

/// Opens a complaint ticket for the authenticated user.
pub async fn create_reclamation(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateReclamationRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let reclamation = sqlx::query_as::<_, Reclamation>(
        r#"
        INSERT INTO reclamations (user_id, subject, message, status)
        VALUES ($1, $2, $3, 'pending')
        RETURNING id, user_id, subject, message, status, response_text, created_at
        "#,
    )
    .bind(claims.user_id())
    .bind(&payload.subject)
    .bind(&payload.message)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(reclamation)))
}

/// Lists the authenticated user's own tickets, newest first.
pub async fn list_my_reclamations(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let reclamations = sqlx::query_as::<_, Reclamation>(
        r#"
        SELECT id, user_id, subject, message, status, response_text, created_at
        FROM reclamations
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(reclamations))
}

/// Lists all tickets, newest first.
/// Admin only.
pub async fn list_reclamations(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let reclamations = sqlx::query_as::<_, Reclamation>(
        r#"
        SELECT id, user_id, subject, message, status, response_text, created_at
        FROM reclamations
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(reclamations))
}

/// Fetches one ticket by ID.
/// Admin only.
pub async fn get_reclamation(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let reclamation = sqlx::query_as::<_, Reclamation>(
        r#"
        SELECT id, user_id, subject, message, status, response_text, created_at
        FROM reclamations
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Reclamation not found".to_string()))?;

    Ok(Json(reclamation))
}

/// Moves a ticket to another status.
/// Admin only.
pub async fn update_reclamation_status(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateReclamationStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !RECLAMATION_STATUSES.contains(&payload.status.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Invalid status '{}'",
            payload.status
        )));
    }

    let result = sqlx::query("UPDATE reclamations SET status = $1 WHERE id = $2")
        .bind(&payload.status)
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Reclamation not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Records the admin's response; responding resolves the ticket.
/// Admin only.
pub async fn respond_to_reclamation(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<ReclamationResponseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let reclamation = sqlx::query_as::<_, Reclamation>(
        r#"
        UPDATE reclamations
        SET response_text = $1, status = 'resolved'
        WHERE id = $2
        RETURNING id, user_id, subject, message, status, response_text, created_at
        "#,
    )
    .bind(&payload.response_text)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Reclamation not found".to_string()))?;

    Ok(Json(reclamation))
}

/// Deletes a ticket by ID.
/// Admin only.
pub async fn delete_reclamation(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM reclamations WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Reclamation not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
