use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::models::{Donation, DonationStatus, EntityType, NewDonation, NewStatusChange};
use super::projects::add_to_project_amount;
use super::status_changes::insert_status_change;
use super::{run, write_transaction, DbPool};

const DONATION_COLUMNS: &str = "id, shelter_id, project_id, donor_id, email, amount, is_anonymous, \
     donation_type, status, payment_intent_id, impact_report_sent, created_at, updated_at";

fn fetch_donation(conn: &Connection, id: &str) -> rusqlite::Result<Option<Donation>> {
    conn.query_row(
        &format!("SELECT {DONATION_COLUMNS} FROM donations WHERE id = ?1"),
        params![id],
        Donation::from_row,
    )
    .optional()
}

/// Creates a `pending` donation awaiting payment.
pub async fn create_donation(pool: &DbPool, donation: NewDonation) -> anyhow::Result<Donation> {
    let created = run(pool, move |conn| {
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO donations (id, shelter_id, project_id, donor_id, email, amount,
                                    is_anonymous, donation_type, status, impact_report_sent,
                                    created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?10)",
            params![
                id,
                donation.shelter_id,
                donation.project_id,
                donation.donor_id,
                donation.email,
                donation.amount,
                donation.is_anonymous,
                donation.donation_type,
                DonationStatus::Pending,
                Utc::now()
            ],
        )?;
        fetch_donation(conn, &id)
    })
    .await?;

    created.ok_or_else(|| anyhow::anyhow!("donation missing after insert"))
}

pub async fn get_donation(pool: &DbPool, id: &str) -> anyhow::Result<Option<Donation>> {
    let id = id.to_string();
    run(pool, move |conn| fetch_donation(conn, &id)).await
}

pub async fn list_donations_by_donor(pool: &DbPool, donor_id: &str) -> anyhow::Result<Vec<Donation>> {
    let donor_id = donor_id.to_string();
    run(pool, move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {DONATION_COLUMNS} FROM donations
             WHERE donor_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![donor_id], Donation::from_row)?;
        rows.collect()
    })
    .await
}

/// Marks a pending donation completed and credits its project.
///
/// Already-settled donations are returned unchanged, so repeated confirmation
/// never credits a project twice.
pub async fn complete_donation(
    pool: &DbPool,
    id: &str,
    payment_intent_id: Option<String>,
) -> anyhow::Result<Option<Donation>> {
    let id = id.to_string();
    run(pool, move |conn| {
        let tx = write_transaction(conn)?;
        let Some(existing) = fetch_donation(&tx, &id)? else {
            return Ok(None);
        };
        if existing.status != DonationStatus::Pending {
            return Ok(Some(existing));
        }

        tx.execute(
            "UPDATE donations SET status = ?2, payment_intent_id = ?3, updated_at = ?4
             WHERE id = ?1 AND status = 'pending'",
            params![id, DonationStatus::Completed, payment_intent_id, Utc::now()],
        )?;

        if let Some(project_id) = existing.project_id.as_deref() {
            if !add_to_project_amount(&tx, project_id, existing.amount as f64)? {
                tracing::warn!("Donation {} references missing project {}", id, project_id);
            }
        }

        insert_status_change(
            &tx,
            &NewStatusChange {
                entity_type: EntityType::Donation,
                entity_id: id.clone(),
                old_status: Some(DonationStatus::Pending.as_str().to_string()),
                new_status: DonationStatus::Completed.as_str().to_string(),
                changed_by: existing.donor_id.clone(),
                notes: None,
            },
        )?;

        let updated = fetch_donation(&tx, &id)?;
        tx.commit()?;
        Ok(updated)
    })
    .await
}
