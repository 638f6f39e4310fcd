// src/handlers/subscription.rs
//
// The subscription ledger: professors purchase time-bounded plan instances;
// "current" is always derived from the rows at read time (active, unexpired,
// latest end date), never cached on the professor profile.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::subscription::{
        CreateSubscriptionRequest, CurrentSubscriptionResponse, PlanTemplate,
        ProfessorSubscription, UpdateSubscriptionStatusRequest,
    },
    utils::jwt::Claims,
};

const EXPIRY_WARNING_DAYS: i64 = 7;

/// Picks the current subscription: active, unexpired, and with the latest
/// end date (not the most recently created).
fn current_subscription(
    subscriptions: Vec<ProfessorSubscription>,
    now: DateTime<Utc>,
) -> Option<ProfessorSubscription> {
    subscriptions
        .into_iter()
        .filter(|s| s.is_active && s.end_date > now)
        .max_by_key(|s| s.end_date)
}

/// Whole-day difference between now and the end date. Negative once the
/// subscription has expired.
fn days_remaining(subscription: &ProfessorSubscription, now: DateTime<Utc>) -> i64 {
    (subscription.end_date - now).num_days()
}

fn is_expiring_soon(subscription: &ProfessorSubscription, now: DateTime<Utc>) -> bool {
    days_remaining(subscription, now) <= EXPIRY_WARNING_DAYS
}

/// Parses a 'yyyy-MM-dd' calendar date into the given time of day, UTC.
fn parse_day(s: &str, hour: u32, min: u32, sec: u32) -> Result<DateTime<Utc>, AppError> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date '{}', expected yyyy-MM-dd", s)))?;
    let datetime = date
        .and_hms_opt(hour, min, sec)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid date '{}'", s)))?;
    Ok(datetime.and_utc())
}

/// Lists the available plan templates (name/price/duration).
pub async fn list_plans(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let plans = sqlx::query_as::<_, PlanTemplate>(
        "SELECT id, name, price, duration_days, created_at FROM subscriptions ORDER BY price DESC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(plans))
}

/// Records a plan purchase for the authenticated professor.
///
/// The plan window runs from 00:00:00 on the start day through 23:59:59 on
/// the end day, inclusive.
pub async fn create_subscription(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let professor_id = claims.user_id();

    let professor_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM professors WHERE user_id = $1)",
    )
    .bind(professor_id)
    .fetch_one(&pool)
    .await?;

    if !professor_exists {
        return Err(AppError::NotFound(format!(
            "Professor not found with ID: {}",
            professor_id
        )));
    }

    let start_date = parse_day(&payload.start_date, 0, 0, 0)?;
    let end_date = parse_day(&payload.end_date, 23, 59, 59)?;

    if end_date < start_date {
        return Err(AppError::BadRequest(
            "End date must not precede start date".to_string(),
        ));
    }

    let subscription = sqlx::query_as::<_, ProfessorSubscription>(
        r#"
        INSERT INTO professor_subscriptions
            (professor_id, plan_type, price, start_date, end_date, payment_method, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, professor_id, plan_type, price, start_date, end_date,
                  payment_method, is_active, created_at
        "#,
    )
    .bind(professor_id)
    .bind(&payload.plan_type)
    .bind(payload.price)
    .bind(start_date)
    .bind(end_date)
    .bind(&payload.payment_method)
    .bind(payload.is_active)
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        "Professor {} purchased plan '{}' until {}",
        professor_id,
        subscription.plan_type,
        subscription.end_date
    );

    Ok((StatusCode::CREATED, Json(subscription)))
}

/// Returns the professor's current subscription with derived expiry info,
/// or 404 when no active, unexpired subscription exists.
pub async fn get_current_subscription(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let rows = fetch_subscriptions(&pool, claims.user_id()).await?;

    let now = Utc::now();
    let subscription = current_subscription(rows, now).ok_or(AppError::NotFound(
        "No active subscription found".to_string(),
    ))?;

    let days = days_remaining(&subscription, now);
    let soon = is_expiring_soon(&subscription, now);

    Ok(Json(CurrentSubscriptionResponse {
        subscription,
        days_remaining: days,
        expiring_soon: soon,
    }))
}

/// Lists the professor's full purchase history, newest first.
pub async fn list_my_subscriptions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let rows = fetch_subscriptions(&pool, claims.user_id()).await?;
    Ok(Json(rows))
}

async fn fetch_subscriptions(
    pool: &PgPool,
    professor_id: i64,
) -> Result<Vec<ProfessorSubscription>, AppError> {
    let rows = sqlx::query_as::<_, ProfessorSubscription>(
        r#"
        SELECT id, professor_id, plan_type, price, start_date, end_date,
               payment_method, is_active, created_at
        FROM professor_subscriptions
        WHERE professor_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(professor_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Lists all purchased subscriptions, newest first. Admin only.
pub async fn list_all_subscriptions(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, ProfessorSubscription>(
        r#"
        SELECT id, professor_id, plan_type, price, start_date, end_date,
               payment_method, is_active, created_at
        FROM professor_subscriptions
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

/// Toggles a subscription's active flag. Admin only.
pub async fn update_subscription_status(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSubscriptionStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("UPDATE professor_subscriptions SET is_active = $1 WHERE id = $2")
        .bind(payload.is_active)
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Subscription not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a subscription row. Admin only.
pub async fn delete_subscription(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM professor_subscriptions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Subscription not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn subscription(id: i64, is_active: bool, end_date: DateTime<Utc>) -> ProfessorSubscription {
        ProfessorSubscription {
            id,
            professor_id: 1,
            plan_type: "Premium Pro".to_string(),
            price: 49900.0,
            start_date: end_date - Duration::days(365),
            end_date,
            payment_method: "card".to_string(),
            is_active,
            created_at: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn latest_end_date_wins() {
        let now = now();
        let e1 = now + Duration::days(30);
        let e2 = now + Duration::days(90);

        // Row with the earlier end date was created later; the tie-break is
        // on end date, not creation order.
        let rows = vec![subscription(2, true, e2), subscription(1, true, e1)];
        let current = current_subscription(rows, now).unwrap();
        assert_eq!(current.id, 2);
        assert_eq!(current.end_date, e2);
    }

    #[test]
    fn inactive_and_expired_rows_are_skipped() {
        let now = now();
        let rows = vec![
            subscription(1, false, now + Duration::days(90)),
            subscription(2, true, now - Duration::days(1)),
        ];
        assert!(current_subscription(rows, now).is_none());
    }

    #[test]
    fn expiry_math() {
        let now = now();

        let soon = subscription(1, true, now + Duration::days(3));
        assert_eq!(days_remaining(&soon, now), 3);
        assert!(is_expiring_soon(&soon, now));

        let later = subscription(2, true, now + Duration::days(10));
        assert_eq!(days_remaining(&later, now), 10);
        assert!(!is_expiring_soon(&later, now));
    }

    #[test]
    fn days_remaining_negative_after_expiry() {
        let now = now();
        let expired = subscription(1, true, now - Duration::days(5));
        assert_eq!(days_remaining(&expired, now), -5);
    }

    #[test]
    fn parse_day_bounds() {
        let start = parse_day("2025-01-10", 0, 0, 0).unwrap();
        let end = parse_day("2025-01-10", 23, 59, 59).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 10, 23, 59, 59).unwrap());
        assert!(parse_day("10/01/2025", 0, 0, 0).is_err());
    }
}
