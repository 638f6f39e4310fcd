// src/handlers/participation.rs
//
// The participation workflow: a participant accesses a quiz (row created
// with score 0), submits selected response ids (row updated with the
// computed score), and professors may flag a participation as fraudulent,
// which freezes further submission.

use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::{
    error::AppError,
    handlers::quiz::{fetch_owned_quiz, fetch_quiz},
    models::{
        participation::{AccessQuizRequest, Participant, Participation, ParticipationWithIdentity, SubmitQuizRequest},
        quiz::{Question, Quiz, ResponseRow},
    },
    utils::jwt::Claims,
};

/// A question counts as correct iff the selected responses belonging to it
/// are exactly its correct responses: every correct one selected, nothing
/// incorrect selected. No partial credit.
fn question_is_correct(
    question_id: i64,
    responses: &[ResponseRow],
    selected: &HashSet<i64>,
) -> bool {
    let correct: HashSet<i64> = responses
        .iter()
        .filter(|r| r.question_id == question_id && r.is_correct)
        .map(|r| r.id)
        .collect();
    let picked: HashSet<i64> = responses
        .iter()
        .filter(|r| r.question_id == question_id && selected.contains(&r.id))
        .map(|r| r.id)
        .collect();

    picked == correct
}

/// Grades a full quiz: (correct questions / total questions) * 100,
/// rounded half-up to two decimals. A quiz with zero questions scores 0.
fn compute_score(questions: &[Question], responses: &[ResponseRow], selected: &HashSet<i64>) -> f64 {
    let total = questions.len();
    if total == 0 {
        return 0.0;
    }

    let correct = questions
        .iter()
        .filter(|q| question_is_correct(q.id, responses, selected))
        .count();

    let raw = (correct as f64 / total as f64) * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Resolves who is participating and verifies the student-only rule for
/// authenticated users. Professors and admins cannot take quizzes.
fn resolve_participant(
    claims: Option<&Claims>,
    guest_id: Option<i64>,
) -> Result<Participant, AppError> {
    if let Some(claims) = claims {
        if claims.role != "student" {
            return Err(AppError::Forbidden(
                "Only students can participate in quizzes".to_string(),
            ));
        }
    }
    Participant::resolve(claims.map(|c| c.user_id()), guest_id)
}

fn require_active(quiz: &Quiz) -> Result<(), AppError> {
    if !quiz.is_joinable() {
        return Err(AppError::BadRequest(
            "Quiz is not open for participation".to_string(),
        ));
    }
    Ok(())
}

/// Inserts the initial participation row (score 0). The partial unique
/// indexes on (quiz_id, user_id) / (quiz_id, guest_id) make duplicates a
/// storage-level conflict rather than a racy existence check.
async fn insert_participation(
    pool: &PgPool,
    quiz_id: i64,
    participant: Participant,
) -> Result<Participation, AppError> {
    sqlx::query_as::<_, Participation>(
        r#"
        INSERT INTO participations (quiz_id, user_id, guest_id, score)
        VALUES ($1, $2, $3, 0)
        RETURNING id, quiz_id, user_id, guest_id, score, is_fraud, student_responses, created_at
        "#,
    )
    .bind(quiz_id)
    .bind(participant.user_id())
    .bind(participant.guest_id())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique") || e.to_string().contains("23505") {
            AppError::Conflict("Already participated in this quiz".to_string())
        } else {
            tracing::error!("Failed to insert participation: {:?}", e);
            AppError::from(e)
        }
    })
}

async fn fetch_participation_for(
    pool: &PgPool,
    quiz_id: i64,
    participant: Participant,
) -> Result<Option<Participation>, AppError> {
    let row = sqlx::query_as::<_, Participation>(
        r#"
        SELECT id, quiz_id, user_id, guest_id, score, is_fraud, student_responses, created_at
        FROM participations
        WHERE quiz_id = $1
          AND (($2::BIGINT IS NOT NULL AND user_id = $2) OR ($3::BIGINT IS NOT NULL AND guest_id = $3))
        "#,
    )
    .bind(quiz_id)
    .bind(participant.user_id())
    .bind(participant.guest_id())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Registers a participation the moment a participant opens a quiz's
/// questions. Tracking starts here with a zero score.
pub async fn access_quiz(
    State(pool): State<PgPool>,
    claims: Option<Extension<Claims>>,
    Path(quiz_id): Path<i64>,
    payload: Option<Json<AccessQuizRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, quiz_id).await?;
    require_active(&quiz)?;

    let guest_id = payload.and_then(|Json(p)| p.guest_id);
    let participant = resolve_participant(claims.as_deref(), guest_id)?;

    let participation = insert_participation(&pool, quiz.id, participant).await?;

    tracing::info!("Participation {} opened for quiz {}", participation.id, quiz.id);

    Ok((StatusCode::CREATED, Json(participation)))
}

/// Joins a quiz by its short code. Same guards as access-by-id; joining
/// by code requires an active quiz, with no exception path.
pub async fn join_by_code(
    State(pool): State<PgPool>,
    claims: Option<Extension<Claims>>,
    Path(code): Path<String>,
    payload: Option<Json<AccessQuizRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, professor_id, title, description, code, duration_minutes, status, created_at
        FROM quizzes
        WHERE code = $1
        "#,
    )
    .bind(code.to_uppercase())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    require_active(&quiz)?;

    let guest_id = payload.and_then(|Json(p)| p.guest_id);
    let participant = resolve_participant(claims.as_deref(), guest_id)?;

    let participation = insert_participation(&pool, quiz.id, participant).await?;

    Ok((StatusCode::CREATED, Json(participation)))
}

/// Authenticated-start entry point for students. Same guards, same insert.
pub async fn start_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, quiz_id).await?;
    require_active(&quiz)?;

    let participant = resolve_participant(Some(&claims), None)?;
    let participation = insert_participation(&pool, quiz.id, participant).await?;

    Ok((StatusCode::CREATED, Json(participation)))
}

/// Submits selected answers for grading.
///
/// Requires an active quiz and an existing participation for this
/// (quiz, participant) pair; fraud-flagged participations reject
/// submission. Updates the existing row, never inserts.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    claims: Option<Extension<Claims>>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, quiz_id).await?;
    require_active(&quiz)?;

    if payload.selected_response_ids.is_empty() {
        return Err(AppError::BadRequest(
            "selected_response_ids must not be empty".to_string(),
        ));
    }

    let participant = resolve_participant(claims.as_deref(), payload.guest_id)?;

    let participation = fetch_participation_for(&pool, quiz.id, participant)
        .await?
        .ok_or(AppError::BadRequest(
            "No participation found for this quiz; access it first".to_string(),
        ))?;

    if participation.is_fraud {
        return Err(AppError::BadRequest(
            "Participation is flagged as fraudulent; submission rejected".to_string(),
        ));
    }

    let questions = sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, question_text FROM questions WHERE quiz_id = $1",
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    let responses = sqlx::query_as::<_, ResponseRow>(
        r#"
        SELECT r.id, r.question_id, r.response_text, r.is_correct
        FROM responses r
        JOIN questions q ON r.question_id = q.id
        WHERE q.quiz_id = $1
        "#,
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    let selected: HashSet<i64> = payload.selected_response_ids.iter().copied().collect();
    let score = compute_score(&questions, &responses, &selected);

    let updated = sqlx::query_as::<_, Participation>(
        r#"
        UPDATE participations
        SET score = $1, student_responses = $2
        WHERE id = $3
        RETURNING id, quiz_id, user_id, guest_id, score, is_fraud, student_responses, created_at
        "#,
    )
    .bind(score)
    .bind(&payload.student_responses)
    .bind(participation.id)
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        "Participation {} submitted for quiz {} with score {:.2}",
        updated.id,
        quiz.id,
        updated.score
    );

    Ok(Json(updated))
}

/// Flags a participation as fraudulent. Quiz owner only. The recorded
/// score is kept; display layers decide whether to honor the flag.
pub async fn mark_fraud(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(participation_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let participation = sqlx::query_as::<_, Participation>(
        r#"
        SELECT id, quiz_id, user_id, guest_id, score, is_fraud, student_responses, created_at
        FROM participations
        WHERE id = $1
        "#,
    )
    .bind(participation_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Participation not found".to_string()))?;

    fetch_owned_quiz(&pool, participation.quiz_id, claims.user_id()).await?;

    let updated = sqlx::query_as::<_, Participation>(
        r#"
        UPDATE participations
        SET is_fraud = TRUE
        WHERE id = $1
        RETURNING id, quiz_id, user_id, guest_id, score, is_fraud, student_responses, created_at
        "#,
    )
    .bind(participation_id)
    .fetch_one(&pool)
    .await?;

    tracing::warn!(
        "Participation {} flagged as fraud by professor {}",
        participation_id,
        claims.user_id()
    );

    Ok(Json(updated))
}

/// Lists participations for a quiz with participant identity resolved.
/// Quiz owner only.
pub async fn list_quiz_participations(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_quiz(&pool, quiz_id, claims.user_id()).await?;

    let participations = sqlx::query_as::<_, ParticipationWithIdentity>(
        r#"
        SELECT p.id, p.quiz_id, p.user_id, p.guest_id, p.score, p.is_fraud, p.created_at,
               COALESCE(u.username, g.pseudo) AS participant_name
        FROM participations p
        LEFT JOIN users u ON p.user_id = u.id
        LEFT JOIN guests g ON p.guest_id = g.id
        WHERE p.quiz_id = $1
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(participations))
}

/// A participation joined with its quiz summary, for the student view.
#[derive(Debug, Serialize, FromRow)]
pub struct ParticipationWithQuiz {
    pub id: i64,
    pub quiz_id: i64,
    pub score: f64,
    pub is_fraud: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub quiz_title: String,
    pub quiz_code: String,
}

/// Lists the authenticated user's own participations, newest first.
pub async fn list_my_participations(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let participations = sqlx::query_as::<_, ParticipationWithQuiz>(
        r#"
        SELECT p.id, p.quiz_id, p.score, p.is_fraud, p.created_at,
               q.title AS quiz_title, q.code AS quiz_code
        FROM participations p
        JOIN quizzes q ON p.quiz_id = q.id
        WHERE p.user_id = $1
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(participations))
}
