use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use uuid::Uuid;

use super::models::{AdoptionApplication, ApplicationStatus, EntityType, NewStatusChange};
use super::status_changes::insert_status_change;
use super::{run, DbPool};

const APPLICATION_COLUMNS: &str = "id, animal_id, user_id, status, application_data, review_notes, \
     reviewed_by, reviewed_at, created_at, updated_at";

fn fetch_application(conn: &Connection, id: &str) -> rusqlite::Result<Option<AdoptionApplication>> {
    conn.query_row(
        &format!("SELECT {APPLICATION_COLUMNS} FROM adoption_applications WHERE id = ?1"),
        params![id],
        AdoptionApplication::from_row,
    )
    .optional()
}

pub async fn create_adoption_application(
    pool: &DbPool,
    animal_id: &str,
    user_id: &str,
    application_data: Value,
) -> anyhow::Result<AdoptionApplication> {
    let animal_id = animal_id.to_string();
    let user_id = user_id.to_string();
    let application = run(pool, move |conn| {
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO adoption_applications (id, animal_id, user_id, status, application_data,
                                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                id,
                animal_id,
                user_id,
                ApplicationStatus::Pending,
                application_data,
                Utc::now()
            ],
        )?;
        fetch_application(conn, &id)
    })
    .await?;

    application.ok_or_else(|| anyhow::anyhow!("Failed to create application"))
}

pub async fn get_adoption_application(
    pool: &DbPool,
    id: &str,
) -> anyhow::Result<Option<AdoptionApplication>> {
    let id = id.to_string();
    run(pool, move |conn| fetch_application(conn, &id)).await
}

/// Applications for one animal, newest first, optionally narrowed to a status.
pub async fn list_adoption_applications(
    pool: &DbPool,
    animal_id: &str,
    status: Option<ApplicationStatus>,
) -> anyhow::Result<Vec<AdoptionApplication>> {
    let animal_id = animal_id.to_string();
    run(pool, move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM adoption_applications
             WHERE animal_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![animal_id, status], AdoptionApplication::from_row)?;
        rows.collect()
    })
    .await
}

pub async fn list_applications_by_user(
    pool: &DbPool,
    user_id: &str,
) -> anyhow::Result<Vec<AdoptionApplication>> {
    let user_id = user_id.to_string();
    run(pool, move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM adoption_applications
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![user_id], AdoptionApplication::from_row)?;
        rows.collect()
    })
    .await
}

fn transition_from_pending(
    conn: &Connection,
    id: &str,
    sql: &str,
    sql_params: &[&dyn rusqlite::ToSql],
    new_status: ApplicationStatus,
    changed_by: &str,
    notes: Option<String>,
) -> rusqlite::Result<Option<AdoptionApplication>> {
    let changed = conn.execute(sql, sql_params)?;
    if changed == 0 {
        return Ok(None);
    }
    insert_status_change(
        conn,
        &NewStatusChange {
            entity_type: EntityType::Application,
            entity_id: id.to_string(),
            old_status: Some(ApplicationStatus::Pending.as_str().to_string()),
            new_status: new_status.as_str().to_string(),
            changed_by: Some(changed_by.to_string()),
            notes,
        },
    )?;
    fetch_application(conn, id)
}

/// Moves a pending application to `decision`. `Ok(None)` when the
/// application does not exist or is no longer pending.
pub async fn review_adoption_application(
    pool: &DbPool,
    id: &str,
    decision: ApplicationStatus,
    review_notes: &str,
    reviewed_by: &str,
) -> anyhow::Result<Option<AdoptionApplication>> {
    let id = id.to_string();
    let review_notes = review_notes.to_string();
    let reviewed_by = reviewed_by.to_string();
    run(pool, move |conn| {
        let now = Utc::now();
        transition_from_pending(
            conn,
            &id,
            "UPDATE adoption_applications
             SET status = ?2, review_notes = ?3, reviewed_by = ?4, reviewed_at = ?5, updated_at = ?5
             WHERE id = ?1 AND status = 'pending'",
            params![id, decision, review_notes, reviewed_by, now],
            decision,
            &reviewed_by,
            Some(review_notes.clone()),
        )
    })
    .await
}

/// Applicant pulls a pending application back.
pub async fn withdraw_adoption_application(
    pool: &DbPool,
    id: &str,
    user_id: &str,
) -> anyhow::Result<Option<AdoptionApplication>> {
    let id = id.to_string();
    let user_id = user_id.to_string();
    run(pool, move |conn| {
        transition_from_pending(
            conn,
            &id,
            "UPDATE adoption_applications SET status = ?3, updated_at = ?4
             WHERE id = ?1 AND user_id = ?2 AND status = 'pending'",
            params![id, user_id, ApplicationStatus::Withdrawn, Utc::now()],
            ApplicationStatus::Withdrawn,
            &user_id,
            None,
        )
    })
    .await
}
