//! Sample records for a freshly registered account.

use chrono::Utc;
use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

use crate::{errors::AppError, structs::LeadStatus, utils, AppState};

const DEMO_CUSTOMERS: [(&str, &str, &str, &str); 3] = [
    ("John Doe", "john", "+1 (555) 123-4567", "ABC Corporation"),
    ("Jane Smith", "jane", "+1 (555) 987-6543", "XYZ Enterprises"),
    ("Bob Johnson", "bob", "+1 (555) 456-7890", "Johnson & Co"),
];

const LEADS_PER_CUSTOMER: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoSummary {
    pub customers: usize,
    pub leads: usize,
}

/// Customer emails are unique table-wide, so the local part is tagged with
/// the owner's id.
fn demo_email(local: &str, owner: Uuid) -> String {
    let simple = owner.simple().to_string();
    format!("{local}+{}@example.com", &simple[..8])
}

pub async fn seed_demo_data(state: &AppState, owner: Uuid) -> Result<DemoSummary, AppError> {
    let planned: Vec<(LeadStatus, f64)> = {
        let mut rng = rand::thread_rng();
        (0..DEMO_CUSTOMERS.len() * LEADS_PER_CUSTOMER)
            .map(|_| {
                let status = *LeadStatus::ALL
                    .choose(&mut rng)
                    .unwrap_or(&LeadStatus::New);
                (status, f64::from(rng.gen_range(1000u32..11000)))
            })
            .collect()
    };

    let mut tx = state.db_pool.begin().await?;
    let now = Utc::now();
    let mut planned = planned.into_iter();
    let mut summary = DemoSummary {
        customers: 0,
        leads: 0,
    };

    for (name, local, phone, company) in DEMO_CUSTOMERS {
        let customer_id = Uuid::new_v4();
        let email = demo_email(local, owner);
        sqlx::query(
            r#"
            INSERT INTO customers
                (id, owner_id, name, email, search_name, search_email, phone, company, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(customer_id)
        .bind(owner)
        .bind(name)
        .bind(&email)
        .bind(utils::search_key(name))
        .bind(utils::search_key(&email))
        .bind(phone)
        .bind(company)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        summary.customers += 1;

        for n in 1..=LEADS_PER_CUSTOMER {
            let (status, value) = planned.next().unwrap_or((LeadStatus::New, 1000.0));
            sqlx::query(
                r#"
                INSERT INTO leads (id, customer_id, title, description, status, value, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(customer_id)
            .bind(format!("Lead {n} for {name}"))
            .bind(format!("This is a sample lead description for {name}."))
            .bind(status)
            .bind(value)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            summary.leads += 1;
        }
    }

    tx.commit().await?;
    log::info!(
        "Seeded {} demo customers and {} leads for user {}",
        summary.customers,
        summary.leads,
        owner
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{customers, reports, structs::PageRequest, test_utils};
    use pretty_assertions::assert_eq;

    #[actix_web::test]
    async fn seeds_three_customers_with_three_leads_each() {
        let state = test_utils::test_state().await;
        let owner = test_utils::insert_user(&state, "owner@example.com").await;

        let summary = seed_demo_data(&state, owner.id).await.unwrap();
        assert_eq!(summary, DemoSummary { customers: 3, leads: 9 });

        let page = customers::list_customers(&state, owner.id, PageRequest::default(), "")
            .await
            .unwrap();
        assert_eq!(page.total, 3);

        let report = reports::leads_by_status(&state, owner.id).await.unwrap();
        let counted = report.new.count
            + report.contacted.count
            + report.converted.count
            + report.lost.count;
        assert_eq!(counted, 9);
        let total = report.new.total_value
            + report.contacted.total_value
            + report.converted.total_value
            + report.lost.total_value;
        assert!((9000.0..99000.0).contains(&total));
    }

    #[actix_web::test]
    async fn two_accounts_can_both_be_seeded() {
        let state = test_utils::test_state().await;
        let a = test_utils::insert_user(&state, "a@example.com").await;
        let b = test_utils::insert_user(&state, "b@example.com").await;
        seed_demo_data(&state, a.id).await.unwrap();
        seed_demo_data(&state, b.id).await.unwrap();

        let b_page = customers::list_customers(&state, b.id, PageRequest::default(), "john doe")
            .await
            .unwrap();
        assert_eq!(b_page.total, 1);
        assert_eq!(b_page.items[0].owner_id, b.id);
    }
}
