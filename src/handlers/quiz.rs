// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{
        CreateQuestionRequest, CreateQuizRequest, CreateResponseRequest, Question,
        QuestionWithResponses, Quiz, QuizStatus, QuizWithQuestions, ResponseRow,
        UpdateQuestionRequest, UpdateQuizRequest, UpdateResponseRequest,
    },
    utils::{code::generate_join_code, jwt::Claims},
};

/// Fetches a quiz or fails with NotFound.
pub async fn fetch_quiz(pool: &PgPool, quiz_id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, professor_id, title, description, code, duration_minutes, status, created_at
        FROM quizzes
        WHERE id = $1
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// Fetches a quiz and enforces that the given professor owns it.
pub async fn fetch_owned_quiz(
    pool: &PgPool,
    quiz_id: i64,
    professor_id: i64,
) -> Result<Quiz, AppError> {
    let quiz = fetch_quiz(pool, quiz_id).await?;
    if quiz.professor_id != professor_id {
        return Err(AppError::Forbidden(
            "Unauthorized to manage this quiz".to_string(),
        ));
    }
    Ok(quiz)
}

/// Walks question -> quiz and enforces ownership.
async fn fetch_owned_question(
    pool: &PgPool,
    question_id: i64,
    professor_id: i64,
) -> Result<Question, AppError> {
    let question = sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, question_text FROM questions WHERE id = $1",
    )
    .bind(question_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    fetch_owned_quiz(pool, question.quiz_id, professor_id).await?;
    Ok(question)
}

/// Walks response -> question -> quiz and enforces ownership.
async fn fetch_owned_response(
    pool: &PgPool,
    response_id: i64,
    professor_id: i64,
) -> Result<ResponseRow, AppError> {
    let response = sqlx::query_as::<_, ResponseRow>(
        "SELECT id, question_id, response_text, is_correct FROM responses WHERE id = $1",
    )
    .bind(response_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Response not found".to_string()))?;

    fetch_owned_question(pool, response.question_id, professor_id).await?;
    Ok(response)
}

/// Creates a quiz for the authenticated professor.
///
/// Generates a unique 8-character join code, regenerating on the (rare)
/// collision with an existing quiz. New quizzes start in 'draft'.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let professor_id = claims.user_id();

    let code = loop {
        let candidate = generate_join_code();
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM quizzes WHERE code = $1)",
        )
        .bind(&candidate)
        .fetch_one(&pool)
        .await?;
        if !exists {
            break candidate;
        }
    };

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        INSERT INTO quizzes (professor_id, title, description, code, duration_minutes, status)
        VALUES ($1, $2, $3, $4, $5, 'draft')
        RETURNING id, professor_id, title, description, code, duration_minutes, status, created_at
        "#,
    )
    .bind(professor_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&code)
    .bind(payload.duration_minutes)
    .fetch_one(&pool)
    .await?;

    tracing::info!("Professor {} created quiz {} ({})", professor_id, quiz.id, quiz.code);

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Updates a quiz. Owner only; only supplied, non-empty fields change.
pub async fn update_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let professor_id = claims.user_id();
    fetch_owned_quiz(&pool, quiz_id, professor_id).await?;

    if let Some(status) = &payload.status {
        if QuizStatus::parse(status).is_none() {
            return Err(AppError::BadRequest(
                "Status must be 'draft', 'active' or 'closed'".to_string(),
            ));
        }
    }

    let title = payload.title.filter(|t| !t.trim().is_empty());
    let description = payload.description.filter(|d| !d.trim().is_empty());

    if title.is_none()
        && description.is_none()
        && payload.duration_minutes.is_none()
        && payload.status.is_none()
    {
        let quiz = fetch_quiz(&pool, quiz_id).await?;
        return Ok(Json(quiz));
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE quizzes SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(description) = description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
    }

    if let Some(duration) = payload.duration_minutes {
        separated.push("duration_minutes = ");
        separated.push_bind_unseparated(duration);
    }

    if let Some(status) = payload.status {
        separated.push("status = ");
        separated.push_bind_unseparated(status);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(quiz_id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let quiz = fetch_quiz(&pool, quiz_id).await?;
    Ok(Json(quiz))
}

/// Deletes a quiz. Owner only; questions, responses and participations
/// cascade at the storage layer.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let professor_id = claims.user_id();
    fetch_owned_quiz(&pool, quiz_id, professor_id).await?;

    sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Lists the authenticated professor's quizzes, newest first.
pub async fn list_my_quizzes(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, professor_id, title, description, code, duration_minutes, status, created_at
        FROM quizzes
        WHERE professor_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(quizzes))
}

/// Fetches a quiz by id.
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, quiz_id).await?;
    Ok(Json(quiz))
}

/// Fetches a quiz with its questions and response options.
/// Correctness flags are hidden from the participant-facing payload.
pub async fn get_quiz_with_questions(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, quiz_id).await?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, question_text FROM questions WHERE quiz_id = $1 ORDER BY id",
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    let responses = sqlx::query_as::<_, ResponseRow>(
        r#"
        SELECT r.id, r.question_id, r.response_text, r.is_correct
        FROM responses r
        JOIN questions q ON r.question_id = q.id
        WHERE q.quiz_id = $1
        ORDER BY r.id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    let questions = questions
        .into_iter()
        .map(|q| {
            let options = responses
                .iter()
                .filter(|r| r.question_id == q.id)
                .cloned()
                .map(Into::into)
                .collect();
            QuestionWithResponses {
                id: q.id,
                quiz_id: q.quiz_id,
                question_text: q.question_text,
                responses: options,
            }
        })
        .collect();

    Ok(Json(QuizWithQuestions { quiz, questions }))
}

/// Resolves a quiz by join code for the public join flow.
/// Only active quizzes are joinable.
pub async fn get_quiz_by_code(
    State(pool): State<PgPool>,
    Path(code): Path<String>,
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

    if !quiz.is_joinable() {
        return Err(AppError::BadRequest(
            "Quiz is not open for participation".to_string(),
        ));
    }

    Ok(Json(quiz))
}

/// Lists all active quizzes, newest first.
pub async fn list_public_quizzes(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, professor_id, title, description, code, duration_minutes, status, created_at
        FROM quizzes
        WHERE status = 'active'
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(quizzes))
}

/// Adds a question to a quiz. Owner only.
pub async fn add_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    fetch_owned_quiz(&pool, quiz_id, claims.user_id()).await?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (quiz_id, question_text)
        VALUES ($1, $2)
        RETURNING id, quiz_id, question_text
        "#,
    )
    .bind(quiz_id)
    .bind(&payload.question_text)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Updates a question's text. Owner only; empty text is ignored.
pub async fn update_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut question = fetch_owned_question(&pool, question_id, claims.user_id()).await?;

    if let Some(text) = payload.question_text.filter(|t| !t.trim().is_empty()) {
        question = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions SET question_text = $1
            WHERE id = $2
            RETURNING id, quiz_id, question_text
            "#,
        )
        .bind(text)
        .bind(question_id)
        .fetch_one(&pool)
        .await?;
    }

    Ok(Json(question))
}

/// Deletes a question. Owner only; responses cascade.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_question(&pool, question_id, claims.user_id()).await?;

    sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(question_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Adds a response option to a question. Owner only.
pub async fn add_response(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
    Json(payload): Json<CreateResponseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    fetch_owned_question(&pool, question_id, claims.user_id()).await?;

    let response = sqlx::query_as::<_, ResponseRow>(
        r#"
        INSERT INTO responses (question_id, response_text, is_correct)
        VALUES ($1, $2, $3)
        RETURNING id, question_id, response_text, is_correct
        "#,
    )
    .bind(question_id)
    .bind(&payload.response_text)
    .bind(payload.is_correct)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Updates a response option. Owner only; empty text is ignored, the
/// correctness flag may be toggled either way.
pub async fn update_response(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(response_id): Path<i64>,
    Json(payload): Json<UpdateResponseRequest>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_response(&pool, response_id, claims.user_id()).await?;

    let text = payload.response_text.filter(|t| !t.trim().is_empty());

    if text.is_some() || payload.is_correct.is_some() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE responses SET ");
        let mut separated = builder.separated(", ");

        if let Some(text) = text {
            separated.push("response_text = ");
            separated.push_bind_unseparated(text);
        }

        if let Some(is_correct) = payload.is_correct {
            separated.push("is_correct = ");
            separated.push_bind_unseparated(is_correct);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(response_id);

        builder.build().execute(&pool).await?;
    }

    let response = sqlx::query_as::<_, ResponseRow>(
        "SELECT id, question_id, response_text, is_correct FROM responses WHERE id = $1",
    )
    .bind(response_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(response))
}

/// Deletes a response option. Owner only.
pub async fn delete_response(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(response_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_response(&pool, response_id, claims.user_id()).await?;

    sqlx::query("DELETE FROM responses WHERE id = $1")
        .bind(response_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
