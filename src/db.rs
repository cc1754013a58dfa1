use std::str::FromStr;

use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    SqlitePool,
};
use uuid::Uuid;

use crate::{errors::AppError, structs::User, utils, AppState};

pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .read_only(false)
        .busy_timeout(std::time::Duration::from_secs(5));

    Ok(SqlitePool::connect_with(opts).await?)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!().run(pool).await?;
    Ok(())
}

pub async fn get_user_by_id(state: &AppState, id: Uuid) -> Result<Option<User>, AppError> {
    let pool = state.db_pool.clone();
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    Ok(user)
}

pub async fn get_user_by_email(state: &AppState, email: &str) -> Result<Option<User>, AppError> {
    let pool = state.db_pool.clone();
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email.trim().to_lowercase())
        .fetch_optional(&pool)
        .await?;
    Ok(user)
}

pub async fn create_user(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let pwd_hash = utils::hash_password(password).map_err(|e| {
        log::error!("Failed to hash password: {}", e);
        AppError::PasswordError(e.to_string())
    })?;
    insert_user(state, name, email, &pwd_hash).await
}

/// Stores a user whose password has already been hashed.
pub async fn insert_user(
    state: &AppState,
    name: &str,
    email: &str,
    pwd_hash: &str,
) -> Result<User, AppError> {
    let pool = state.db_pool.clone();
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, name, email, pwd_hash, role, created_at) VALUES (?, ?, ?, ?, 'user', ?) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(name.trim())
    .bind(email.trim().to_lowercase())
    .bind(pwd_hash)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| AppError::conflict_or_db(e, "Email already registered"))?;
    log::info!("User created: {}", user.id);
    Ok(user)
}

/// Succeeds only when `customer_id` exists and belongs to `owner`. Every
/// operation on a customer's leads goes through here first, and a foreign
/// customer is reported exactly like a missing one.
pub async fn ensure_owned_customer(
    state: &AppState,
    owner: Uuid,
    customer_id: Uuid,
) -> Result<(), AppError> {
    let pool = state.db_pool.clone();
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM customers WHERE id = ? AND owner_id = ?",
    )
    .bind(customer_id)
    .bind(owner)
    .fetch_one(&pool)
    .await?;
    if found == 0 {
        return Err(AppError::customer_not_found());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{customers, structs::NewCustomer, test_utils};
    use pretty_assertions::assert_eq;

    #[actix_web::test]
    async fn emails_are_stored_lowercase_and_unique() {
        let state = test_utils::test_state().await;
        let user = insert_user(&state, " Ada ", "Ada@Example.com", "hash").await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada");
        assert_eq!(user.role, "user");

        let err = insert_user(&state, "Other", "ADA@example.com", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[actix_web::test]
    async fn lookup_by_email_ignores_case() {
        let state = test_utils::test_state().await;
        let user = test_utils::insert_user(&state, "grace@example.com").await;
        let found = get_user_by_email(&state, "GRACE@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(get_user_by_id(&state, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn ownership_check_hides_foreign_customers() {
        let state = test_utils::test_state().await;
        let owner = test_utils::insert_user(&state, "a@example.com").await;
        let other = test_utils::insert_user(&state, "b@example.com").await;
        let customer = customers::create_customer(
            &state,
            owner.id,
            NewCustomer {
                name: "Acme".into(),
                email: "acme@example.com".into(),
                phone: None,
                company: None,
            },
        )
        .await
        .unwrap();

        assert!(ensure_owned_customer(&state, owner.id, customer.id).await.is_ok());
        for (who, id) in [(other.id, customer.id), (owner.id, Uuid::new_v4())] {
            let err = ensure_owned_customer(&state, who, id).await.unwrap_err();
            assert_eq!(err.to_string(), "Customer not found");
        }
    }
}
