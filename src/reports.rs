use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    errors::AppError,
    structs::{LeadStatus, LeadsByStatus, StatusSummary},
    AppState,
};

#[derive(Debug, FromRow)]
struct StatusRow {
    status: String,
    count: i64,
    total_value: f64,
}

/// Count and summed value of the owner's leads per status. All four statuses
/// are always present.
pub async fn leads_by_status(state: &AppState, owner: Uuid) -> Result<LeadsByStatus, AppError> {
    let pool = state.db_pool.clone();
    let rows = sqlx::query_as::<_, StatusRow>(
        r#"
        SELECT status, COUNT(*) AS count, TOTAL(value) AS total_value
        FROM leads
        WHERE customer_id IN (SELECT id FROM customers WHERE owner_id = ?)
        GROUP BY status
        "#,
    )
    .bind(owner)
    .fetch_all(&pool)
    .await?;

    let mut report = LeadsByStatus::default();
    for row in rows {
        match row.status.parse::<LeadStatus>() {
            Ok(status) => {
                *report.entry_mut(status) = StatusSummary {
                    count: row.count,
                    total_value: row.total_value,
                };
            }
            Err(_) => {
                // Excluded from the report, but not silently.
                log::warn!(
                    "Skipping {} leads with unknown status {:?} for user {}",
                    row.count,
                    row.status,
                    owner
                );
            }
        }
    }
    Ok(report)
}
