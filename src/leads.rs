//! Lead data access. Leads have no owner column of their own; each operation
//! checks the parent customer with [`db::ensure_owned_customer`] and then
//! repeats the ownership predicate inside the statement that touches the
//! lead row, so a customer deleted in between can never gain a new lead.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db,
    errors::AppError,
    structs::{Lead, LeadChanges, LeadStatus, NewLead, Page, PageRequest},
    AppState,
};

pub async fn list_leads(
    state: &AppState,
    owner: Uuid,
    customer_id: Uuid,
    request: PageRequest,
    status: Option<LeadStatus>,
) -> Result<Page<Lead>, AppError> {
    db::ensure_owned_customer(state, owner, customer_id).await?;
    let pool = state.db_pool.clone();

    let leads = sqlx::query_as::<_, Lead>(
        r#"
        SELECT * FROM leads
        WHERE customer_id = ? AND (? IS NULL OR status = ?)
        ORDER BY created_at DESC, rowid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(customer_id)
    .bind(status)
    .bind(status)
    .bind(request.limit)
    .bind(request.offset())
    .fetch_all(&pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leads WHERE customer_id = ? AND (? IS NULL OR status = ?)",
    )
    .bind(customer_id)
    .bind(status)
    .bind(status)
    .fetch_one(&pool)
    .await?;

    Ok(Page::new(leads, total, request))
}

/// All leads of an owned customer, newest first.
pub async fn leads_for_customer(
    state: &AppState,
    owner: Uuid,
    customer_id: Uuid,
) -> Result<Vec<Lead>, AppError> {
    let pool = state.db_pool.clone();
    let leads = sqlx::query_as::<_, Lead>(
        r#"
        SELECT * FROM leads
        WHERE customer_id = ?
          AND customer_id IN (SELECT id FROM customers WHERE owner_id = ?)
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(customer_id)
    .bind(owner)
    .fetch_all(&pool)
    .await?;
    Ok(leads)
}

pub async fn get_lead(
    state: &AppState,
    owner: Uuid,
    customer_id: Uuid,
    lead_id: Uuid,
) -> Result<Lead, AppError> {
    db::ensure_owned_customer(state, owner, customer_id).await?;
    let pool = state.db_pool.clone();
    sqlx::query_as::<_, Lead>(
        r#"
        SELECT * FROM leads
        WHERE id = ? AND customer_id = ?
          AND customer_id IN (SELECT id FROM customers WHERE owner_id = ?)
        "#,
    )
    .bind(lead_id)
    .bind(customer_id)
    .bind(owner)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(AppError::lead_not_found)
}

pub async fn create_lead(
    state: &AppState,
    owner: Uuid,
    customer_id: Uuid,
    fields: NewLead,
) -> Result<Lead, AppError> {
    db::ensure_owned_customer(state, owner, customer_id).await?;
    let pool = state.db_pool.clone();
    let now = Utc::now();

    // The insert is conditional on the parent still being owned.
    let lead = sqlx::query_as::<_, Lead>(
        r#"
        INSERT INTO leads (id, customer_id, title, description, status, value, created_at, updated_at)
        SELECT ?, ?, ?, ?, ?, ?, ?, ?
        WHERE EXISTS (SELECT 1 FROM customers WHERE id = ? AND owner_id = ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(customer_id)
    .bind(fields.title.trim())
    .bind(fields.description)
    .bind(fields.status.unwrap_or(LeadStatus::New))
    .bind(fields.value.unwrap_or(0.0))
    .bind(now)
    .bind(now)
    .bind(customer_id)
    .bind(owner)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(AppError::customer_not_found)?;
    log::info!("Lead {} created for customer {}", lead.id, customer_id);
    Ok(lead)
}

pub async fn update_lead(
    state: &AppState,
    owner: Uuid,
    customer_id: Uuid,
    lead_id: Uuid,
    changes: LeadChanges,
) -> Result<Lead, AppError> {
    db::ensure_owned_customer(state, owner, customer_id).await?;
    let pool = state.db_pool.clone();
    let lead = sqlx::query_as::<_, Lead>(
        r#"
        UPDATE leads SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            status = COALESCE(?, status),
            value = COALESCE(?, value),
            updated_at = ?
        WHERE id = ? AND customer_id = ?
          AND customer_id IN (SELECT id FROM customers WHERE owner_id = ?)
        RETURNING *
        "#,
    )
    .bind(changes.title.as_deref().map(str::trim))
    .bind(changes.description)
    .bind(changes.status)
    .bind(changes.value)
    .bind(Utc::now())
    .bind(lead_id)
    .bind(customer_id)
    .bind(owner)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(AppError::lead_not_found)?;
    log::info!("Lead {} updated", lead.id);
    Ok(lead)
}

pub async fn delete_lead(
    state: &AppState,
    owner: Uuid,
    customer_id: Uuid,
    lead_id: Uuid,
) -> Result<(), AppError> {
    db::ensure_owned_customer(state, owner, customer_id).await?;
    let pool = state.db_pool.clone();
    let deleted = sqlx::query(
        r#"
        DELETE FROM leads
        WHERE id = ? AND customer_id = ?
          AND customer_id IN (SELECT id FROM customers WHERE owner_id = ?)
        "#,
    )
    .bind(lead_id)
    .bind(customer_id)
    .bind(owner)
    .execute(&pool)
    .await?
    .rows_affected();
    if deleted == 0 {
        return Err(AppError::lead_not_found());
    }
    log::info!("Lead {} deleted", lead_id);
    Ok(())
}
