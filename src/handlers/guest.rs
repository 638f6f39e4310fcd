// src/handlers/guest.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::guest::{CreateGuestRequest, Guest},
};

/// Creates a guest identity so an anonymous visitor can join a quiz.
pub async fn create_guest(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateGuestRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let guest = sqlx::query_as::<_, Guest>(
        r#"
        INSERT INTO guests (pseudo, email)
        VALUES ($1, $2)
        RETURNING id, pseudo, email, created_at
        "#,
    )
    .bind(&payload.pseudo)
    .bind(&payload.email)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(guest)))
}

/// Fetches a guest by id.
pub async fn get_guest(
    State(pool): State<PgPool>,
    Path(guest_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let guest = sqlx::query_as::<_, Guest>(
        "SELECT id, pseudo, email, created_at FROM guests WHERE id = $1",
    )
    .bind(guest_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Guest not found".to_string()))?;

    Ok(Json(guest))
}
