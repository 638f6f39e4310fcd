// src/state.rs

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::Config;

/// Shared application state handed to every handler.
///
/// Carries the Postgres pool (quizzes, participations, subscriptions,
/// tickets) and the runtime config (JWT secret and expiry used by the
/// auth middleware).
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
}

/// Lets handlers extract `State<PgPool>` directly.
impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

/// Lets the JWT middleware and login handler extract `State<Config>`.
impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
