//! Shared fixtures: a migrated in-memory database per test.

use std::{path::Path, str::FromStr};

use actix_web::{http::header, web::Data};
use chrono::Duration;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::{auth::TokenKeys, db, structs::User, AppState};

pub const TEST_SECRET: &[u8] = b"test-secret-do-not-use";

/// One connection only: every `:memory:` connection is its own database.
pub async fn test_state_with(seed_demo_data: bool) -> Data<AppState> {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await
        .unwrap();
    db::migrate(&pool).await.unwrap();
    Data::new(AppState::new(
        pool,
        TokenKeys::new(TEST_SECRET, Duration::hours(1)),
        seed_demo_data,
    ))
}

pub async fn test_state() -> Data<AppState> {
    test_state_with(false).await
}

/// A database file under `dir` behind the production pool, so statements
/// from concurrent tasks really run on separate connections.
pub async fn file_state(dir: &Path) -> Data<AppState> {
    let url = format!("sqlite://{}", dir.join("crm.db").display());
    let pool = db::connect(&url).await.unwrap();
    db::migrate(&pool).await.unwrap();
    Data::new(AppState::new(
        pool,
        TokenKeys::new(TEST_SECRET, Duration::hours(1)),
        false,
    ))
}

/// Inserts a user with a placeholder hash, skipping argon2.
pub async fn insert_user(state: &AppState, email: &str) -> User {
    db::insert_user(state, "Test User", email, "not-a-real-hash")
        .await
        .unwrap()
}

pub fn bearer(state: &AppState, user: &User) -> (header::HeaderName, String) {
    let token = state.tokens.issue(user.id).unwrap();
    (header::AUTHORIZATION, format!("Bearer {token}"))
}
