// src/handlers/student.rs
//
// Student-facing history and statistics derived from participations.

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::{error::AppError, utils::jwt::Claims};

/// One line of the quiz history view: the participation joined with quiz
/// summary, professor name and the participant's rank for that quiz.
#[derive(Debug, Serialize, FromRow)]
pub struct QuizHistoryEntry {
    pub participation_id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub quiz_description: Option<String>,
    pub score: f64,
    pub is_fraud: bool,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub professor_name: String,
    /// 1 + the number of strictly better scores on the same quiz.
    pub rank: i64,
    pub total_participants: i64,
}

/// Aggregated statistics for the student dashboard.
#[derive(Debug, Serialize)]
pub struct StudentStats {
    pub username: String,
    pub student_name: String,
    pub total_quizzes: i64,
    pub average_score: f64,
    pub best_score: f64,
    pub perfect_quizzes: i64,
    pub success_rate: f64,
    pub current_streak: i64,
    pub member_since: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(FromRow)]
struct StatsRow {
    total: i64,
    average: Option<f64>,
    best: Option<f64>,
    perfect: i64,
}

#[derive(FromRow)]
struct ProfileRow {
    username: String,
    first_name: String,
    last_name: String,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Counts the consecutive-day streak of participation: distinct days,
/// counted back from `today` (or yesterday, to not break the streak before
/// the student has played today). A gap of more than one day ends it.
fn calculate_streak(mut days: Vec<NaiveDate>, today: NaiveDate) -> i64 {
    days.sort_unstable();
    days.dedup();
    days.reverse();

    let Some(&latest) = days.first() else {
        return 0;
    };

    let yesterday = today.pred_opt().unwrap_or(today);
    if latest != today && latest != yesterday {
        return 0;
    }

    let mut streak = 1;
    for pair in days.windows(2) {
        if (pair[0] - pair[1]).num_days() == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// Returns the authenticated student's quiz history, newest first.
pub async fn get_quiz_history(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let history = sqlx::query_as::<_, QuizHistoryEntry>(
        r#"
        SELECT p.id AS participation_id,
               p.quiz_id,
               q.title AS quiz_title,
               q.description AS quiz_description,
               p.score,
               p.is_fraud,
               p.created_at AS completed_at,
               COALESCE(NULLIF(TRIM(pr.first_name || ' ' || pr.last_name), ''), u.username)
                   AS professor_name,
               (SELECT COUNT(*) + 1 FROM participations b
                WHERE b.quiz_id = p.quiz_id AND b.score > p.score) AS rank,
               (SELECT COUNT(*) FROM participations b
                WHERE b.quiz_id = p.quiz_id) AS total_participants
        FROM participations p
        JOIN quizzes q ON p.quiz_id = q.id
        JOIN users u ON q.professor_id = u.id
        LEFT JOIN professors pr ON pr.user_id = q.professor_id
        WHERE p.user_id = $1
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(history))
}

/// Returns aggregated statistics for the authenticated student.
pub async fn get_student_stats(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let profile = sqlx::query_as::<_, ProfileRow>(
        r#"
        SELECT u.username,
               COALESCE(s.first_name, '') AS first_name,
               COALESCE(s.last_name, '') AS last_name,
               u.created_at
        FROM users u
        LEFT JOIN students s ON s.user_id = u.id
        WHERE u.id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Student not found".to_string()))?;

    let stats = sqlx::query_as::<_, StatsRow>(
        r#"
        SELECT COUNT(*) AS total,
               AVG(score) AS average,
               MAX(score) AS best,
               COUNT(*) FILTER (WHERE score = 100) AS perfect
        FROM participations
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let timestamps = sqlx::query_scalar::<_, chrono::DateTime<chrono::Utc>>(
        "SELECT created_at FROM participations WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    let days: Vec<NaiveDate> = timestamps.iter().map(|t| t.date_naive()).collect();
    let streak = calculate_streak(days, chrono::Utc::now().date_naive());

    let average = round2(stats.average.unwrap_or(0.0));
    let student_name = {
        let full = format!("{} {}", profile.first_name, profile.last_name);
        let full = full.trim().to_string();
        if full.is_empty() {
            profile.username.clone()
        } else {
            full
        }
    };

    Ok(Json(StudentStats {
        username: profile.username,
        student_name,
        total_quizzes: stats.total,
        average_score: average,
        best_score: stats.best.unwrap_or(0.0),
        perfect_quizzes: stats.perfect,
        // Scores are already percentages, so the mean doubles as the
        // success rate.
        success_rate: average,
        current_streak: streak,
        member_since: profile.created_at,
    }))
}
