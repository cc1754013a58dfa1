//! Customer data access. Every statement carries an `owner_id` predicate, so
//! a caller can only ever see or touch its own customers.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    errors::AppError,
    leads,
    structs::{Customer, CustomerChanges, CustomerWithLeads, NewCustomer, Page, PageRequest},
    utils, AppState,
};

const DUPLICATE_EMAIL: &str = "Email already exists";

pub async fn list_customers(
    state: &AppState,
    owner: Uuid,
    request: PageRequest,
    search: &str,
) -> Result<Page<Customer>, AppError> {
    let pool = state.db_pool.clone();
    let pattern = format!("%{}%", utils::escape_like(&utils::search_key(search)));

    let customers = sqlx::query_as::<_, Customer>(
        r#"
        SELECT * FROM customers
        WHERE owner_id = ?
          AND (search_name LIKE ? ESCAPE '\' OR search_email LIKE ? ESCAPE '\')
        ORDER BY created_at DESC, rowid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(owner)
    .bind(&pattern)
    .bind(&pattern)
    .bind(request.limit)
    .bind(request.offset())
    .fetch_all(&pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM customers
        WHERE owner_id = ?
          AND (search_name LIKE ? ESCAPE '\' OR search_email LIKE ? ESCAPE '\')
        "#,
    )
    .bind(owner)
    .bind(&pattern)
    .bind(&pattern)
    .fetch_one(&pool)
    .await?;

    Ok(Page::new(customers, total, request))
}

pub async fn get_customer(state: &AppState, owner: Uuid, id: Uuid) -> Result<Customer, AppError> {
    let pool = state.db_pool.clone();
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ? AND owner_id = ?")
        .bind(id)
        .bind(owner)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(AppError::customer_not_found)
}

pub async fn get_customer_with_leads(
    state: &AppState,
    owner: Uuid,
    id: Uuid,
) -> Result<CustomerWithLeads, AppError> {
    let customer = get_customer(state, owner, id).await?;
    let leads = leads::leads_for_customer(state, owner, customer.id).await?;
    Ok(CustomerWithLeads { customer, leads })
}

pub async fn create_customer(
    state: &AppState,
    owner: Uuid,
    fields: NewCustomer,
) -> Result<Customer, AppError> {
    let pool = state.db_pool.clone();
    let now = Utc::now();
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers
            (id, owner_id, name, email, search_name, search_email, phone, company, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner)
    .bind(fields.name.trim())
    .bind(fields.email.trim())
    .bind(utils::search_key(&fields.name))
    .bind(utils::search_key(&fields.email))
    .bind(fields.phone)
    .bind(fields.company)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| AppError::conflict_or_db(e, DUPLICATE_EMAIL))?;
    log::info!("Customer {} created for user {}", customer.id, owner);
    Ok(customer)
}

pub async fn update_customer(
    state: &AppState,
    owner: Uuid,
    id: Uuid,
    changes: CustomerChanges,
) -> Result<Customer, AppError> {
    let pool = state.db_pool.clone();
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        UPDATE customers SET
            name = COALESCE(?, name),
            email = COALESCE(?, email),
            search_name = COALESCE(?, search_name),
            search_email = COALESCE(?, search_email),
            phone = COALESCE(?, phone),
            company = COALESCE(?, company),
            updated_at = ?
        WHERE id = ? AND owner_id = ?
        RETURNING *
        "#,
    )
    .bind(changes.name.as_deref().map(str::trim))
    .bind(changes.email.as_deref().map(str::trim))
    .bind(changes.name.as_deref().map(utils::search_key))
    .bind(changes.email.as_deref().map(utils::search_key))
    .bind(changes.phone)
    .bind(changes.company)
    .bind(Utc::now())
    .bind(id)
    .bind(owner)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::conflict_or_db(e, DUPLICATE_EMAIL))?
    .ok_or_else(AppError::customer_not_found)?;
    log::info!("Customer {} updated", customer.id);
    Ok(customer)
}

/// Removes the customer and its leads in one transaction. Returns how many
/// leads went with it.
pub async fn delete_customer(state: &AppState, owner: Uuid, id: Uuid) -> Result<u64, AppError> {
    let mut tx = state.db_pool.begin().await?;

    let leads_removed = sqlx::query(
        r#"
        DELETE FROM leads
        WHERE customer_id = ?
          AND customer_id IN (SELECT id FROM customers WHERE owner_id = ?)
        "#,
    )
    .bind(id)
    .bind(owner)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let deleted = sqlx::query("DELETE FROM customers WHERE id = ? AND owner_id = ?")
        .bind(id)
        .bind(owner)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if deleted == 0 {
        tx.rollback().await?;
        return Err(AppError::customer_not_found());
    }

    tx.commit().await?;
    log::info!("Customer {} deleted with {} leads", id, leads_removed);
    Ok(leads_removed)
}
