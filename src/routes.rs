// src/routes.rs

use axum::{
    Router, http::Method,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, guest, participation, quiz, reclamation, student, subscription},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, optional_auth_middleware, professor_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, guests, quizzes, participations,
///   students, subscriptions, reclamations, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    // Middleware that verifies tokens only needs the JWT part of the state.
    let config = state.config.clone();

    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let guest_routes = Router::new()
        .route("/", post(guest::create_guest))
        .route("/{id}", get(guest::get_guest));

    let quiz_routes = Router::new()
        // Public catalog routes
        .route("/public", get(quiz::list_public_quizzes))
        .route("/code/{code}", get(quiz::get_quiz_by_code))
        .route("/{id}", get(quiz::get_quiz))
        .route("/{id}/full", get(quiz::get_quiz_with_questions))
        // Professor-owned catalog management
        .merge(
            Router::new()
                .route("/", post(quiz::create_quiz))
                .route("/mine", get(quiz::list_my_quizzes))
                .route("/{id}", put(quiz::update_quiz).delete(quiz::delete_quiz))
                .route("/{id}/questions", post(quiz::add_question))
                .route(
                    "/questions/{id}",
                    put(quiz::update_question).delete(quiz::delete_question),
                )
                .route("/questions/{id}/responses", post(quiz::add_response))
                .route(
                    "/responses/{id}",
                    put(quiz::update_response).delete(quiz::delete_response),
                )
                .route(
                    "/{id}/participations",
                    get(participation::list_quiz_participations),
                )
                .layer(middleware::from_fn(professor_middleware))
                .layer(middleware::from_fn_with_state(
                    config.clone(),
                    auth_middleware,
                )),
        );

    let participation_routes = Router::new()
        // Open to students and guests alike
        .merge(
            Router::new()
                .route("/access/{id}", post(participation::access_quiz))
                .route("/join/{code}", post(participation::join_by_code))
                .route("/{id}/submit", post(participation::submit_quiz))
                .layer(middleware::from_fn_with_state(
                    config.clone(),
                    optional_auth_middleware,
                )),
        )
        .merge(
            Router::new()
                .route("/{id}/start", post(participation::start_quiz))
                .route("/mine", get(participation::list_my_participations))
                .layer(middleware::from_fn_with_state(
                    config.clone(),
                    auth_middleware,
                )),
        )
        .merge(
            Router::new()
                .route("/{id}/fraud", put(participation::mark_fraud))
                .layer(middleware::from_fn(professor_middleware))
                .layer(middleware::from_fn_with_state(
                    config.clone(),
                    auth_middleware,
                )),
        );

    let student_routes = Router::new()
        .route("/history", get(student::get_quiz_history))
        .route("/stats", get(student::get_student_stats))
        .layer(middleware::from_fn_with_state(
            config.clone(),
            auth_middleware,
        ));

    let subscription_routes = Router::new()
        .route("/plans", get(subscription::list_plans))
        .merge(
            Router::new()
                .route("/", post(subscription::create_subscription))
                .route("/current", get(subscription::get_current_subscription))
                .route("/mine", get(subscription::list_my_subscriptions))
                .layer(middleware::from_fn(professor_middleware))
                .layer(middleware::from_fn_with_state(
                    config.clone(),
                    auth_middleware,
                )),
        );

    let reclamation_routes = Router::new()
        .route("/", post(reclamation::create_reclamation))
        .route("/mine", get(reclamation::list_my_reclamations))
        .layer(middleware::from_fn_with_state(
            config.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/quizzes/{id}", delete(admin::delete_any_quiz))
        .route("/reclamations", get(reclamation::list_reclamations))
        .route(
            "/reclamations/{id}",
            get(reclamation::get_reclamation).delete(reclamation::delete_reclamation),
        )
        .route(
            "/reclamations/{id}/status",
            put(reclamation::update_reclamation_status),
        )
        .route(
            "/reclamations/{id}/respond",
            post(reclamation::respond_to_reclamation),
        )
        .route("/subscriptions", get(subscription::list_all_subscriptions))
        .route(
            "/subscriptions/{id}/status",
            put(subscription::update_subscription_status),
        )
        .route(
            "/subscriptions/{id}",
            delete(subscription::delete_subscription),
        )
        .route("/stats", get(admin::get_dashboard_stats))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            config.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/guests", guest_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/participations", participation_routes)
        .nest("/api/students", student_routes)
        .nest("/api/subscriptions", subscription_routes)
        .nest("/api/reclamations", reclamation_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
