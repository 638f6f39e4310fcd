// tests/api_tests.rs

use flashmind_backend::{config::Config, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345"), or None when
/// DATABASE_URL is not set so the suite can be run without a database.
async fn spawn_app() -> Option<String> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState { pool, config };

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(address)
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers a user with the given role and returns (token, user_id).
async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    role: &str,
) -> (String, i64) {
    let username = unique_name("u");
    let password = "password123";

    let register_resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": password,
            "role": role
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(register_resp.status().as_u16(), 201);

    let user: serde_json::Value = register_resp.json().await.unwrap();
    let user_id = user["id"].as_i64().expect("User id not found");

    let login_resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    let token = login_resp["token"].as_str().expect("Token not found");
    assert_eq!(login_resp["role"], role);

    (token.to_string(), user_id)
}

/// Creates an active quiz with one question (one correct, one wrong
/// response). Returns (quiz_id, code, correct_id, wrong_id).
async fn setup_active_quiz(
    client: &reqwest::Client,
    address: &str,
    prof_token: &str,
) -> (i64, String, i64, i64) {
    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .header("Authorization", format!("Bearer {}", prof_token))
        .json(&serde_json::json!({ "title": "Single question" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();
    let code = quiz["code"].as_str().unwrap().to_string();

    let question: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/questions", address, quiz_id))
        .header("Authorization", format!("Bearer {}", prof_token))
        .json(&serde_json::json!({ "question_text": "Q" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let question_id = question["id"].as_i64().unwrap();

    let mut ids = Vec::new();
    for (answer, is_correct) in [("Right", true), ("Wrong", false)] {
        let response: serde_json::Value = client
            .post(format!(
                "{}/api/quizzes/questions/{}/responses",
                address, question_id
            ))
            .header("Authorization", format!("Bearer {}", prof_token))
            .json(&serde_json::json!({
                "response_text": answer,
                "is_correct": is_correct
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        ids.push(response["id"].as_i64().unwrap());
    }

    let response = client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", prof_token))
        .json(&serde_json::json!({ "status": "active" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    (quiz_id, code, ids[0], ids[1])
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_rejects_admin_role() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": unique_name("u"),
            "email": format!("{}@example.com", unique_name("m")),
            "password": "password123",
            "role": "admin"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn register_fails_validation() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    // Username too short
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "yo",
            "email": "yo@example.com",
            "password": "password123",
            "role": "student"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn professor_routes_require_professor_role() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let (student_token, _) = register_and_login(&client, &address, "student").await;

    // No token at all: 401
    let response = client
        .post(format!("{}/api/quizzes", address))
        .json(&serde_json::json!({ "title": "Nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Student token: 403
    let response = client
        .post(format!("{}/api/quizzes", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({ "title": "Nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

/// End-to-end flow: a professor builds and activates a quiz, a guest joins
/// by code and submits, and duplicate participation is rejected.
#[tokio::test]
async fn test_guest_participation_flow() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let (prof_token, _) = register_and_login(&client, &address, "professor").await;

    // 1. Create a draft quiz
    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .header("Authorization", format!("Bearer {}", prof_token))
        .json(&serde_json::json!({
            "title": "Capitals of Europe",
            "description": "Basic geography",
            "duration_minutes": 10
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let quiz_id = quiz["id"].as_i64().unwrap();
    let code = quiz["code"].as_str().unwrap().to_string();
    assert_eq!(quiz["status"], "draft");
    assert_eq!(code.len(), 8);

    // 2. Add two questions, each with one correct and one wrong response
    let mut correct_ids = Vec::new();
    for text in ["Capital of France?", "Capital of Spain?"] {
        let question: serde_json::Value = client
            .post(format!("{}/api/quizzes/{}/questions", address, quiz_id))
            .header("Authorization", format!("Bearer {}", prof_token))
            .json(&serde_json::json!({ "question_text": text }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let question_id = question["id"].as_i64().unwrap();

        for (answer, is_correct) in [("Right", true), ("Wrong", false)] {
            let response: serde_json::Value = client
                .post(format!(
                    "{}/api/quizzes/questions/{}/responses",
                    address, question_id
                ))
                .header("Authorization", format!("Bearer {}", prof_token))
                .json(&serde_json::json!({
                    "response_text": answer,
                    "is_correct": is_correct
                }))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if is_correct {
                correct_ids.push(response["id"].as_i64().unwrap());
            }
        }
    }

    // 3. Create a guest identity
    let guest: serde_json::Value = client
        .post(format!("{}/api/guests", address))
        .json(&serde_json::json!({ "pseudo": unique_name("guest") }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let guest_id = guest["id"].as_i64().unwrap();

    // 4. Draft quizzes cannot be joined
    let response = client
        .post(format!("{}/api/participations/join/{}", address, code))
        .json(&serde_json::json!({ "guest_id": guest_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // 5. Activate the quiz
    let response = client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", prof_token))
        .json(&serde_json::json!({ "status": "active" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // 6. Guest joins by code
    let response = client
        .post(format!("{}/api/participations/join/{}", address, code))
        .json(&serde_json::json!({ "guest_id": guest_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    // 7. Joining twice conflicts
    let response = client
        .post(format!("{}/api/participations/join/{}", address, code))
        .json(&serde_json::json!({ "guest_id": guest_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // 8. Submit every correct answer: 100.0
    let submission: serde_json::Value = client
        .post(format!("{}/api/participations/{}/submit", address, quiz_id))
        .json(&serde_json::json!({
            "selected_response_ids": correct_ids,
            "guest_id": guest_id
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(submission["score"], 100.0);

    // 9. The professor sees the participation with the guest's name
    let participations: Vec<serde_json::Value> = client
        .get(format!(
            "{}/api/quizzes/{}/participations",
            address, quiz_id
        ))
        .header("Authorization", format!("Bearer {}", prof_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(participations.len(), 1);
    assert_eq!(participations[0]["guest_id"].as_i64().unwrap(), guest_id);
}

/// A student starts a quiz through the authenticated entry point and a
/// partial submission is graded per question with no partial credit.
#[tokio::test]
async fn test_student_scoring_and_stats() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let (prof_token, _) = register_and_login(&client, &address, "professor").await;
    let (student_token, _) = register_and_login(&client, &address, "student").await;

    // Professor sets up an active quiz with two questions
    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .header("Authorization", format!("Bearer {}", prof_token))
        .json(&serde_json::json!({ "title": "Halves" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();

    let mut correct_ids = Vec::new();
    let mut wrong_ids = Vec::new();
    for text in ["Q1", "Q2"] {
        let question: serde_json::Value = client
            .post(format!("{}/api/quizzes/{}/questions", address, quiz_id))
            .header("Authorization", format!("Bearer {}", prof_token))
            .json(&serde_json::json!({ "question_text": text }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let question_id = question["id"].as_i64().unwrap();

        for (answer, is_correct) in [("Right", true), ("Wrong", false)] {
            let response: serde_json::Value = client
                .post(format!(
                    "{}/api/quizzes/questions/{}/responses",
                    address, question_id
                ))
                .header("Authorization", format!("Bearer {}", prof_token))
                .json(&serde_json::json!({
                    "response_text": answer,
                    "is_correct": is_correct
                }))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            let id = response["id"].as_i64().unwrap();
            if is_correct {
                correct_ids.push(id);
            } else {
                wrong_ids.push(id);
            }
        }
    }

    client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", prof_token))
        .json(&serde_json::json!({ "status": "active" }))
        .send()
        .await
        .unwrap();

    // Student starts then submits: first question right, second wrong
    let response = client
        .post(format!("{}/api/participations/{}/start", address, quiz_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let submission: serde_json::Value = client
        .post(format!("{}/api/participations/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({
            "selected_response_ids": [correct_ids[0], wrong_ids[1]]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(submission["score"], 50.0);

    // History shows the attempt with rank information
    let history: Vec<serde_json::Value> = client
        .get(format!("{}/api/students/history", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["score"], 50.0);
    assert_eq!(history[0]["rank"], 1);

    // Stats aggregate the single attempt
    let stats: serde_json::Value = client
        .get(format!("{}/api/students/stats", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_quizzes"], 1);
    assert_eq!(stats["average_score"], 50.0);
    assert_eq!(stats["best_score"], 50.0);
    assert_eq!(stats["current_streak"], 1);
}

/// A flagged participation keeps its recorded score but rejects any
/// further submission.
#[tokio::test]
async fn fraud_flag_blocks_resubmission() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let (prof_token, _) = register_and_login(&client, &address, "professor").await;
    let (quiz_id, _code, correct_id, _wrong_id) =
        setup_active_quiz(&client, &address, &prof_token).await;

    let guest: serde_json::Value = client
        .post(format!("{}/api/guests", address))
        .json(&serde_json::json!({ "pseudo": unique_name("guest") }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let guest_id = guest["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/api/participations/access/{}", address, quiz_id))
        .json(&serde_json::json!({ "guest_id": guest_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    // Professor flags the participation
    let participations: Vec<serde_json::Value> = client
        .get(format!(
            "{}/api/quizzes/{}/participations",
            address, quiz_id
        ))
        .header("Authorization", format!("Bearer {}", prof_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let participation_id = participations[0]["id"].as_i64().unwrap();

    let flagged: serde_json::Value = client
        .put(format!(
            "{}/api/participations/{}/fraud",
            address, participation_id
        ))
        .header("Authorization", format!("Bearer {}", prof_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(flagged["is_fraud"], true);

    // Submission is now rejected
    let response = client
        .post(format!("{}/api/participations/{}/submit", address, quiz_id))
        .json(&serde_json::json!({
            "selected_response_ids": [correct_id],
            "guest_id": guest_id
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

/// Submitting requires a prior access/join/start: no row, no grade.
#[tokio::test]
async fn submit_without_access_is_rejected() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let (prof_token, _) = register_and_login(&client, &address, "professor").await;
    let (quiz_id, _code, correct_id, _wrong_id) =
        setup_active_quiz(&client, &address, &prof_token).await;

    let guest: serde_json::Value = client
        .post(format!("{}/api/guests", address))
        .json(&serde_json::json!({ "pseudo": unique_name("guest") }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/participations/{}/submit", address, quiz_id))
        .json(&serde_json::json!({
            "selected_response_ids": [correct_id],
            "guest_id": guest["id"].as_i64().unwrap()
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

/// Quiz mutations are owner-scoped: another professor gets 403.
#[tokio::test]
async fn quiz_mutations_are_owner_scoped() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let (owner_token, _) = register_and_login(&client, &address, "professor").await;
    let (other_token, _) = register_and_login(&client, &address, "professor").await;
    let (quiz_id, _code, _correct_id, _wrong_id) =
        setup_active_quiz(&client, &address, &owner_token).await;

    let response = client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", other_token))
        .json(&serde_json::json!({ "title": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .delete(format!("{}/api/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", other_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // The owner still can
    let response = client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", owner_token))
        .json(&serde_json::json!({ "title": "Still mine" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

/// Partial updates touch only supplied, non-empty fields.
#[tokio::test]
async fn partial_update_preserves_unset_fields() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let (prof_token, _) = register_and_login(&client, &address, "professor").await;

    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .header("Authorization", format!("Bearer {}", prof_token))
        .json(&serde_json::json!({
            "title": "Original title",
            "description": "Original description",
            "duration_minutes": 15
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();

    // Update only the title
    let updated: serde_json::Value = client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", prof_token))
        .json(&serde_json::json!({ "title": "New title" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["title"], "New title");
    assert_eq!(updated["description"], "Original description");
    assert_eq!(updated["duration_minutes"], 15);
    assert_eq!(updated["status"], "draft");

    // Empty strings do not overwrite existing fields
    let updated: serde_json::Value = client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", prof_token))
        .json(&serde_json::json!({ "title": "", "description": "" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["title"], "New title");
    assert_eq!(updated["description"], "Original description");
}

/// Professors cannot take quizzes, even their own.
#[tokio::test]
async fn professors_cannot_participate() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let (prof_token, _) = register_and_login(&client, &address, "professor").await;

    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .header("Authorization", format!("Bearer {}", prof_token))
        .json(&serde_json::json!({ "title": "Self test" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();

    client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", prof_token))
        .json(&serde_json::json!({ "status": "active" }))
        .send()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/participations/access/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", prof_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}
